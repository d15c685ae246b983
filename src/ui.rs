use std::time::Duration;

use crossterm::{
    event::{self, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    symbols::Marker,
    widgets::{canvas::Canvas, Block, Borders, Paragraph, Row, Table},
};

use crate::client::Backend;
use crate::config::Config;
use crate::monitor::{Monitor, Phase, Session, SharedView, ViewState};
use crate::render::{self, Viewport};

/// Interactive watch screen. Owns user intent: `s` starts a session, `x`
/// stops it, `q` quits. The polling task updates the shared view; this
/// loop only ever redraws from it.
pub async fn run(client: Backend, cfg: Config) -> anyhow::Result<()> {
    std::io::stdout().execute(EnterAlternateScreen)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(std::io::stdout()))?;

    let view = ViewState::shared();
    let mut session: Option<Session> = None;

    loop {
        {
            let state = view.lock().await;
            terminal.draw(|frame| draw(frame, &state))?;
        }

        if event::poll(Duration::from_millis(100))? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') => break,
                    KeyCode::Char('s') => {
                        start_session(&client, &cfg, &view, &mut session).await;
                    }
                    KeyCode::Char('x') => {
                        // No-op when nothing is running.
                        if let Some(live) = session.take() {
                            live.stop();
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    if let Some(live) = session.take() {
        live.stop();
    }

    disable_raw_mode()?;
    std::io::stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

async fn start_session(
    client: &Backend,
    cfg: &Config,
    view: &SharedView,
    session: &mut Option<Session>,
) {
    if view.lock().await.phase == Phase::Running {
        return;
    }

    // Guarded again here even though config validation already rejects it:
    // a zero-node session must never reach the backend.
    if cfg.n_nodes == 0 {
        view.lock().await.status = "invalid node count".to_string();
        return;
    }

    match client.start(cfg.n_nodes).await {
        Ok(()) => {
            if let Some(old) = session.take() {
                old.stop();
            }
            view.lock().await.begin_session();
            *session = Some(Monitor::spawn(
                client.clone(),
                view.clone(),
                Duration::from_millis(cfg.tick_ms),
            ));
        }
        Err(err) => {
            // Stays Idle; the rejection is only surfaced.
            view.lock().await.status = format!("start failed: {err}");
        }
    }
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "idle",
        Phase::Running => "running",
        Phase::Stopped => "stopped",
    }
}

fn draw(frame: &mut Frame, state: &ViewState) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(3), Constraint::Min(0)])
        .split(frame.area());

    let header = Paragraph::new(format!(
        "t: {} | live: {} | failures: {} | avg downtime: {:.1}t | {}",
        state.sim_time,
        state.live_nodes,
        state.dashboard.dead_count,
        state.dashboard.avg_downtime,
        state.status,
    ))
    .block(Block::default().borders(Borders::ALL).title(format!(
        "meshwatch [{}] | s: start | x: stop | q: quit",
        phase_label(state.phase)
    )));
    frame.render_widget(header, layout[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Percentage(68), Constraint::Percentage(32)])
        .split(layout[1]);

    draw_topology(frame, body[0], state);
    draw_failures(frame, body[1], state);
}

fn draw_topology(frame: &mut Frame, area: Rect, state: &ViewState) {
    // Braille resolution of the pane inside the borders: 2 dots per cell
    // horizontally, 4 vertically. Recomputed every frame, so terminal
    // resizes reshape the transform automatically.
    let view_px = Viewport {
        width: area.width.saturating_sub(2) as f64 * 2.0,
        height: area.height.saturating_sub(2) as f64 * 4.0,
    };

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title("Topology"))
        .marker(Marker::Braille)
        .x_bounds([0.0, view_px.width])
        .y_bounds([0.0, view_px.height])
        .paint(|ctx| match &state.snapshot {
            Some(snap) => render::paint(ctx, view_px, snap),
            None => ctx.print(
                (view_px.width / 2.0 - 16.0).max(0.0),
                view_px.height / 2.0,
                "waiting for first snapshot...",
            ),
        });
    frame.render_widget(canvas, area);
}

fn draw_failures(frame: &mut Frame, area: Rect, state: &ViewState) {
    let rows: Vec<Row> = state
        .dashboard
        .recent
        .iter()
        .map(|stat| {
            Row::new(vec![
                format!("{}", stat.id),
                format!("{}t", stat.downtime),
                format!("@{}", stat.dead_since),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Percentage(35),
            Constraint::Percentage(35),
        ],
    )
    .header(Row::new(vec!["Node", "Down for", "Since"]))
    .block(Block::default().borders(Borders::ALL).title(format!(
        "Recent Failures ({})",
        state.dashboard.dead_count
    )));

    frame.render_widget(table, area);
}
