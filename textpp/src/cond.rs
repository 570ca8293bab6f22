/// Stack of nested `#if`/`#ifdef` frames.
///
/// Each open conditional contributes one boolean: whether its current branch
/// is active. `#else` flips the innermost frame in place.
#[derive(Debug, Default)]
pub(crate) struct ConditionalStack {
    states: Vec<bool>,
}

impl ConditionalStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new conditional frame.
    pub fn push(&mut self, active: bool) {
        self.states.push(active);
    }

    /// Close the innermost frame. `None` means there was nothing to close.
    pub fn pop(&mut self) -> Option<bool> {
        self.states.pop()
    }

    /// Flip the innermost frame; false if no frame is open.
    pub fn flip_top(&mut self) -> bool {
        match self.states.last_mut() {
            Some(top) => {
                *top = !*top;
                true
            }
            None => false,
        }
    }

    /// A line is eligible for output iff no frame is open or the innermost
    /// frame is active.
    pub fn eligible(&self) -> bool {
        self.states.last().copied().unwrap_or(true)
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stack_is_eligible() {
        let cond = ConditionalStack::new();
        assert!(cond.eligible());
        assert_eq!(cond.depth(), 0);
    }

    #[test]
    fn top_frame_decides_eligibility() {
        let mut cond = ConditionalStack::new();
        cond.push(false);
        assert!(!cond.eligible());
        cond.push(true);
        assert!(cond.eligible());
        assert_eq!(cond.pop(), Some(true));
        assert!(!cond.eligible());
    }

    #[test]
    fn flip_inverts_innermost_only() {
        let mut cond = ConditionalStack::new();
        assert!(!cond.flip_top());
        cond.push(true);
        cond.push(false);
        assert!(cond.flip_top());
        assert!(cond.eligible());
        cond.pop();
        assert!(cond.eligible());
    }
}
