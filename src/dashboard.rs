use crate::snapshot::FailureStat;

/// How many entries the recent-failures list shows.
pub const MAX_RECENT: usize = 10;

/// Derived failure dashboard. Recomputed in full from every snapshot's
/// `dead_stats` list. Membership and downtimes change between ticks, so
/// incremental updates are not worth the stale-state risk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dashboard {
    pub dead_count: usize,
    /// Mean downtime in ticks, rounded to one decimal. 0 when nothing died.
    pub avg_downtime: f64,
    /// Most recent failures first (highest `dead_since`), at most
    /// [`MAX_RECENT`] entries.
    pub recent: Vec<FailureStat>,
}

impl Dashboard {
    pub fn from_stats(stats: &[FailureStat]) -> Self {
        let dead_count = stats.len();

        let avg_downtime = if dead_count == 0 {
            0.0
        } else {
            let total: u64 = stats.iter().map(|s| s.downtime).sum();
            (total as f64 / dead_count as f64 * 10.0).round() / 10.0
        };

        let mut recent = stats.to_vec();
        recent.sort_by(|a, b| b.dead_since.cmp(&a.dead_since));
        recent.truncate(MAX_RECENT);

        Self {
            dead_count,
            avg_downtime,
            recent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(id: u32, dead_since: u64, downtime: u64) -> FailureStat {
        FailureStat {
            id,
            dead_since,
            downtime,
        }
    }

    #[test]
    fn test_empty_stats() {
        let dash = Dashboard::from_stats(&[]);
        assert_eq!(dash.dead_count, 0);
        assert_eq!(dash.avg_downtime, 0.0);
        assert!(dash.recent.is_empty());
    }

    #[test]
    fn test_average_downtime() {
        let dash = Dashboard::from_stats(&[stat(0, 5, 10), stat(1, 6, 20)]);
        assert_eq!(dash.dead_count, 2);
        assert_eq!(dash.avg_downtime, 15.0);

        // 5/3 rounds up at the first decimal.
        let dash = Dashboard::from_stats(&[stat(0, 1, 1), stat(1, 2, 2), stat(2, 3, 2)]);
        assert_eq!(dash.avg_downtime, 1.7);
    }

    #[test]
    fn test_recent_sorted_by_death_tick() {
        let dash = Dashboard::from_stats(&[stat(7, 5, 3), stat(8, 1, 9), stat(9, 9, 1)]);
        let order: Vec<u32> = dash.recent.iter().map(|s| s.id).collect();
        assert_eq!(order, vec![9, 7, 8]);
    }

    #[test]
    fn test_recent_truncated() {
        let stats: Vec<FailureStat> = (0..25).map(|i| stat(i, i as u64, 1)).collect();
        let dash = Dashboard::from_stats(&stats);
        assert_eq!(dash.dead_count, 25);
        assert_eq!(dash.recent.len(), MAX_RECENT);
        // Latest death leads the list.
        assert_eq!(dash.recent[0].id, 24);
    }
}
