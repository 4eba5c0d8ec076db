/// Hold counter gating a script thread.
///
/// There is no wait queue: whoever clears the external condition (a speech
/// line finishing, an animation ending) calls [`Semaphore::release`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Semaphore {
    hold_count: u32,
}

impl Semaphore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hold(&mut self) {
        self.hold_count = self.hold_count.saturating_add(1);
    }

    /// Decrement the hold count, never going below zero.
    pub fn release(&mut self) {
        self.hold_count = self.hold_count.saturating_sub(1);
    }

    pub fn is_held(&self) -> bool {
        self.hold_count > 0
    }

    pub fn hold_count(&self) -> u32 {
        self.hold_count
    }
}
