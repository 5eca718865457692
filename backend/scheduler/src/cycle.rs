/// Round-robin turn assignment for one run.
///
/// Turn `k` (1-indexed) goes to the agent at position `(k - 1) % n`.
#[derive(Debug, Clone)]
pub struct TurnCycle<'a> {
    agents: &'a [String],
    position: usize,
    turn: u32,
    remaining: u32,
}

impl<'a> TurnCycle<'a> {
    /// Callers must pass a non-empty agent list.
    pub fn new(agents: &'a [String], turns: u32) -> Self {
        Self {
            agents,
            position: 0,
            turn: 0,
            remaining: turns,
        }
    }
}

impl<'a> Iterator for TurnCycle<'a> {
    /// `(turn number, agent id)`
    type Item = (u32, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.agents.is_empty() {
            return None;
        }
        let agent = self.agents[self.position].as_str();
        self.position = (self.position + 1) % self.agents.len();
        self.remaining -= 1;
        self.turn += 1;
        Some((self.turn, agent))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = if self.agents.is_empty() { 0 } else { self.remaining as usize };
        (n, Some(n))
    }
}

/// Split a comma-separated agent list, trimming entries and dropping blanks.
pub fn parse_agent_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
