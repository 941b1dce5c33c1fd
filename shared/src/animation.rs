use log::debug;

/// Animation collaborator. States request clip crossfades on entry; the
/// per-tick drive values live in the simulation state so they survive
/// replay, and the host reads them from there each frame.
pub trait Animator: Send {
    fn crossfade(&mut self, clip: &'static str);
}

/// Discards all animation requests. Default for headless roles.
#[derive(Debug, Default)]
pub struct NullAnimator;

impl Animator for NullAnimator {
    fn crossfade(&mut self, _clip: &'static str) {}
}

/// Logs clip changes; stands in for a real animation backend on the client.
#[derive(Debug, Default)]
pub struct LoggingAnimator;

impl Animator for LoggingAnimator {
    fn crossfade(&mut self, clip: &'static str) {
        debug!("crossfade to '{}'", clip);
    }
}
