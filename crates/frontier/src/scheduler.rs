use std::collections::{HashMap, VecDeque};

/// Outcome of one scheduling pass over the host table.
#[derive(Debug, PartialEq, Eq)]
pub enum NextOutcome {
    /// A URL whose host is outside its politeness window.
    Ready((String, u32)),
    /// URLs exist but every host is still inside its window.
    Waiting,
    /// Every host queue is empty.
    Drained,
}

/// Per-host FIFO queues with per-host last-request timestamps. Hosts are
/// scanned in the order they first appeared; FIFO within a host.
#[derive(Default)]
pub struct HostQueues {
    queues: HashMap<String, VecDeque<(String, u32)>>,
    order: Vec<String>,
    last_request_ms: HashMap<String, i64>,
}

impl HostQueues {
    pub fn push(&mut self, host: &str, url: String, depth: u32) {
        if !self.queues.contains_key(host) {
            self.order.push(host.to_string());
        }
        self.queues
            .entry(host.to_string())
            .or_default()
            .push_back((url, depth));
    }

    /// One pass: pop from the first host that is ready. Hosts found empty
    /// are dropped from the table (they reappear on the next push). The
    /// politeness clock for a host starts when its URL is handed out.
    pub fn next_ready(&mut self, politeness_ms: i64, now_ms: i64) -> NextOutcome {
        let hosts: Vec<String> = self.order.clone();
        let mut ready = None;

        for host in &hosts {
            let Some(queue) = self.queues.get_mut(host) else {
                continue;
            };
            if queue.is_empty() {
                self.queues.remove(host);
                continue;
            }
            let last = self.last_request_ms.get(host).copied().unwrap_or(0);
            if now_ms - last >= politeness_ms {
                if let Some((url, depth)) = queue.pop_front() {
                    self.last_request_ms.insert(host.clone(), now_ms);
                    ready = Some((url, depth));
                    break;
                }
            }
        }

        self.order.retain(|h| self.queues.contains_key(h));

        match ready {
            Some(task) => NextOutcome::Ready(task),
            None if self.is_empty() => NextOutcome::Drained,
            None => NextOutcome::Waiting,
        }
    }

    pub fn total_len(&self) -> usize {
        self.queues.values().map(|q| q.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.values().all(|q| q.is_empty())
    }

    pub fn last_request_snapshot(&self) -> HashMap<String, i64> {
        self.last_request_ms.clone()
    }

    pub fn load_last_request(&mut self, snapshot: HashMap<String, i64>) {
        self.last_request_ms = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: i64 = 500;

    fn ready_url(outcome: NextOutcome) -> String {
        match outcome {
            NextOutcome::Ready((url, _)) => url,
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    #[test]
    fn empty_table_is_drained() {
        let mut queues = HostQueues::default();
        assert_eq!(queues.next_ready(DELAY, 1_000), NextOutcome::Drained);
    }

    #[test]
    fn fifo_within_host() {
        let mut queues = HostQueues::default();
        queues.push("a.ics.uci.edu", "u1".to_string(), 0);
        queues.push("a.ics.uci.edu", "u2".to_string(), 1);

        assert_eq!(ready_url(queues.next_ready(DELAY, 1_000)), "u1");
        assert_eq!(ready_url(queues.next_ready(DELAY, 1_500)), "u2");
    }

    #[test]
    fn politeness_window_blocks_same_host() {
        let mut queues = HostQueues::default();
        queues.push("a.ics.uci.edu", "u1".to_string(), 0);
        queues.push("a.ics.uci.edu", "u2".to_string(), 0);

        assert_eq!(ready_url(queues.next_ready(DELAY, 1_000)), "u1");
        assert_eq!(queues.next_ready(DELAY, 1_200), NextOutcome::Waiting);
        assert_eq!(ready_url(queues.next_ready(DELAY, 1_500)), "u2");
    }

    #[test]
    fn different_hosts_interleave_without_waiting() {
        let mut queues = HostQueues::default();
        queues.push("a.ics.uci.edu", "a1".to_string(), 0);
        queues.push("b.ics.uci.edu", "b1".to_string(), 0);

        assert_eq!(ready_url(queues.next_ready(DELAY, 1_000)), "a1");
        // same instant: a is blocked, b is free
        assert_eq!(ready_url(queues.next_ready(DELAY, 1_000)), "b1");
        assert_eq!(queues.next_ready(DELAY, 1_000), NextOutcome::Drained);
    }

    #[test]
    fn hosts_scanned_in_first_seen_order() {
        let mut queues = HostQueues::default();
        queues.push("b.ics.uci.edu", "b1".to_string(), 0);
        queues.push("a.ics.uci.edu", "a1".to_string(), 0);

        assert_eq!(ready_url(queues.next_ready(DELAY, 1_000)), "b1");
        assert_eq!(ready_url(queues.next_ready(DELAY, 1_000)), "a1");
    }

    #[test]
    fn drained_host_reappears_on_push() {
        let mut queues = HostQueues::default();
        queues.push("a.ics.uci.edu", "u1".to_string(), 0);
        assert_eq!(ready_url(queues.next_ready(DELAY, 1_000)), "u1");
        assert_eq!(queues.next_ready(DELAY, 2_000), NextOutcome::Drained);

        queues.push("a.ics.uci.edu", "u2".to_string(), 3);
        // the politeness clock survives the host's disappearance
        assert_eq!(queues.next_ready(DELAY, 1_200), NextOutcome::Waiting);
        assert_eq!(ready_url(queues.next_ready(DELAY, 2_000)), "u2");
    }

    #[test]
    fn zero_delay_never_waits() {
        let mut queues = HostQueues::default();
        queues.push("a.ics.uci.edu", "u1".to_string(), 0);
        queues.push("a.ics.uci.edu", "u2".to_string(), 0);

        assert_eq!(ready_url(queues.next_ready(0, 1_000)), "u1");
        assert_eq!(ready_url(queues.next_ready(0, 1_000)), "u2");
    }

    #[test]
    fn loaded_timestamps_apply() {
        let mut queues = HostQueues::default();
        let mut snapshot = HashMap::new();
        snapshot.insert("a.ics.uci.edu".to_string(), 900);
        queues.load_last_request(snapshot);

        queues.push("a.ics.uci.edu", "u1".to_string(), 0);
        assert_eq!(queues.next_ready(DELAY, 1_000), NextOutcome::Waiting);
        assert_eq!(ready_url(queues.next_ready(DELAY, 1_400)), "u1");
    }
}
