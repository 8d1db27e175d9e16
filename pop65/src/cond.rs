//! Conditional assembly state (`.if` / `.else` / `.endif`)

use tracing::trace;

use crate::error::{AsmError, ErrorKind, Result};
use crate::symbol::Pass;

#[derive(Debug, Clone, Copy)]
struct Frame {
    own: bool,
    else_seen: bool,
    parent_live: bool,
}

impl Frame {
    fn live(&self) -> bool {
        self.parent_live && self.own
    }
}

/// Nested conditional frames plus the pass 1 decisions replayed in pass 2.
///
/// Every operation that can close a frame takes a `base`: the depth at which
/// the current source file started. Frames below it belong to an including
/// file and cannot be touched.
#[derive(Debug, Default)]
pub struct CondStack {
    frames: Vec<Frame>,
    decisions: Vec<bool>,
    cursor: usize,
}

impl CondStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare for a traversal. Pass 1 forgets old decisions, pass 2
    /// rewinds to replay them.
    pub fn start_pass(&mut self, pass: Pass) {
        self.frames.clear();
        self.cursor = 0;
        if pass == Pass::One {
            self.decisions.clear();
        }
    }

    pub fn is_live(&self) -> bool {
        self.frames.last().is_none_or(Frame::live)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Open a frame. `decide` is only called for a live `.if` in pass 1.
    pub fn push_if<F>(&mut self, pass: Pass, decide: F) -> Result<()>
    where
        F: FnOnce() -> Result<bool>,
    {
        let parent_live = self.is_live();
        let own = if !parent_live {
            false
        } else {
            match pass {
                Pass::One => {
                    let taken = decide()?;
                    self.decisions.push(taken);
                    taken
                }
                Pass::Two => {
                    let taken = self.decisions.get(self.cursor).copied().ok_or_else(|| {
                        AsmError::new(ErrorKind::Phase, ".if not seen in pass 1")
                    })?;
                    self.cursor += 1;
                    taken
                }
            }
        };
        trace!(depth = self.frames.len() + 1, parent_live, own, ".if");
        self.frames.push(Frame {
            own,
            else_seen: false,
            parent_live,
        });
        Ok(())
    }

    pub fn flip_else(&mut self, base: usize) -> Result<()> {
        if self.frames.len() <= base {
            return Err(AsmError::new(ErrorKind::UnmatchedElse, ".else without .if"));
        }
        let Some(frame) = self.frames.last_mut() else {
            return Err(AsmError::new(ErrorKind::UnmatchedElse, ".else without .if"));
        };
        if frame.else_seen {
            return Err(AsmError::new(ErrorKind::UnmatchedElse, "second .else for one .if"));
        }
        frame.own = !frame.own;
        frame.else_seen = true;
        Ok(())
    }

    pub fn pop_endif(&mut self, base: usize) -> Result<()> {
        if self.frames.len() <= base {
            return Err(AsmError::new(ErrorKind::UnmatchedEndif, ".endif without .if"));
        }
        self.frames.pop();
        Ok(())
    }

    /// Called when a source file ends. Frames it left open are an error.
    pub fn close_file(&mut self, base: usize) -> Result<()> {
        let open = self.frames.len().saturating_sub(base);
        self.frames.truncate(base);
        if open > 0 {
            return Err(AsmError::new(
                ErrorKind::UnclosedIf,
                format!("{} .if block(s) still open at end of file", open),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_if_else_liveness() {
        let mut cond = CondStack::new();
        cond.start_pass(Pass::One);
        assert!(cond.is_live());
        cond.push_if(Pass::One, || Ok(false)).unwrap();
        assert!(!cond.is_live());
        cond.flip_else(0).unwrap();
        assert!(cond.is_live());
        cond.pop_endif(0).unwrap();
        assert!(cond.is_live());
    }

    #[test]
    fn test_dead_parent_skips_decision() {
        let mut cond = CondStack::new();
        cond.start_pass(Pass::One);
        cond.push_if(Pass::One, || Ok(false)).unwrap();
        cond.push_if(Pass::One, || panic!("must not evaluate")).unwrap();
        cond.flip_else(0).unwrap();
        assert!(!cond.is_live());
        cond.pop_endif(0).unwrap();
        cond.pop_endif(0).unwrap();
        assert_eq!(cond.decisions, vec![false]);
    }

    #[test]
    fn test_pass2_replays_decisions() {
        let mut cond = CondStack::new();
        cond.start_pass(Pass::One);
        cond.push_if(Pass::One, || Ok(true)).unwrap();
        cond.pop_endif(0).unwrap();
        cond.push_if(Pass::One, || Ok(false)).unwrap();
        cond.pop_endif(0).unwrap();

        cond.start_pass(Pass::Two);
        cond.push_if(Pass::Two, || panic!("replayed")).unwrap();
        assert!(cond.is_live());
        cond.pop_endif(0).unwrap();
        cond.push_if(Pass::Two, || panic!("replayed")).unwrap();
        assert!(!cond.is_live());
    }

    #[test]
    fn test_unmatched() {
        let mut cond = CondStack::new();
        assert_eq!(cond.flip_else(0).unwrap_err().kind(), ErrorKind::UnmatchedElse);
        assert_eq!(cond.pop_endif(0).unwrap_err().kind(), ErrorKind::UnmatchedEndif);

        cond.push_if(Pass::One, || Ok(true)).unwrap();
        cond.flip_else(0).unwrap();
        assert_eq!(cond.flip_else(0).unwrap_err().kind(), ErrorKind::UnmatchedElse);
    }

    #[test]
    fn test_file_boundaries() {
        let mut cond = CondStack::new();
        cond.push_if(Pass::One, || Ok(true)).unwrap();
        let base = cond.depth();
        assert_eq!(cond.pop_endif(base).unwrap_err().kind(), ErrorKind::UnmatchedEndif);
        cond.push_if(Pass::One, || Ok(true)).unwrap();
        assert_eq!(cond.close_file(base).unwrap_err().kind(), ErrorKind::UnclosedIf);
        assert_eq!(cond.depth(), base);
        cond.close_file(0).unwrap_err();
        assert_eq!(cond.depth(), 0);
    }
}
