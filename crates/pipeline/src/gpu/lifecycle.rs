use thiserror::Error;

/// Where the device-dependent resource set currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// No device yet.
    Uninitialized,
    /// Device and resources are valid; frames may render.
    Ready,
    /// The device went away; every device-dependent resource is stale.
    Lost,
    /// Rebuild in progress after a loss.
    Restoring,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("lifecycle cannot {event} while {from:?}")]
pub struct TransitionError {
    pub from: LifecycleState,
    pub event: &'static str,
}

/// Hosts that own the swapchain notify the pipeline through this when the
/// device drops out from under it.
pub trait DeviceNotify {
    fn device_lost(&mut self) -> anyhow::Result<()>;
    fn device_restored(&mut self) -> anyhow::Result<()>;
}

/// Tracks device validity and stamps each resource build with a generation.
///
/// The generation increments every time a fresh resource set comes up, so a
/// restored pipeline is observably distinct from the one that was lost even
/// though it renders the same content.
#[derive(Debug)]
pub struct DeviceLifecycle {
    state: LifecycleState,
    generation: u64,
}

impl DeviceLifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            generation: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Generation of the live resource set; 0 until first initialisation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }

    /// First-time bring-up finished.
    pub fn initialized(&mut self) -> Result<(), TransitionError> {
        match self.state {
            LifecycleState::Uninitialized => {
                self.state = LifecycleState::Ready;
                self.generation = 1;
                Ok(())
            }
            from => Err(TransitionError {
                from,
                event: "initialize",
            }),
        }
    }

    /// The device was lost; resources are now stale.
    pub fn lost(&mut self) -> Result<(), TransitionError> {
        match self.state {
            LifecycleState::Ready => {
                self.state = LifecycleState::Lost;
                Ok(())
            }
            from => Err(TransitionError {
                from,
                event: "record a loss",
            }),
        }
    }

    /// Rebuild started.
    pub fn restore_started(&mut self) -> Result<(), TransitionError> {
        match self.state {
            LifecycleState::Lost => {
                self.state = LifecycleState::Restoring;
                Ok(())
            }
            from => Err(TransitionError {
                from,
                event: "start a restore",
            }),
        }
    }

    /// Rebuild finished; the new resource set gets the next generation.
    pub fn restored(&mut self) -> Result<(), TransitionError> {
        match self.state {
            LifecycleState::Restoring => {
                self.state = LifecycleState::Ready;
                self.generation += 1;
                Ok(())
            }
            from => Err(TransitionError {
                from,
                event: "finish a restore",
            }),
        }
    }
}

impl Default for DeviceLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_initialisation_reaches_ready_at_generation_one() {
        let mut lifecycle = DeviceLifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
        assert_eq!(lifecycle.generation(), 0);

        lifecycle.initialized().unwrap();
        assert!(lifecycle.is_ready());
        assert_eq!(lifecycle.generation(), 1);
    }

    #[test]
    fn loss_and_restore_walk_the_full_cycle() {
        let mut lifecycle = DeviceLifecycle::new();
        lifecycle.initialized().unwrap();

        lifecycle.lost().unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Lost);
        assert!(!lifecycle.is_ready());

        lifecycle.restore_started().unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Restoring);

        lifecycle.restored().unwrap();
        assert!(lifecycle.is_ready());
    }

    #[test]
    fn each_restore_yields_a_distinct_generation() {
        let mut lifecycle = DeviceLifecycle::new();
        lifecycle.initialized().unwrap();
        let first = lifecycle.generation();

        lifecycle.lost().unwrap();
        lifecycle.restore_started().unwrap();
        lifecycle.restored().unwrap();
        let second = lifecycle.generation();

        lifecycle.lost().unwrap();
        lifecycle.restore_started().unwrap();
        lifecycle.restored().unwrap();
        let third = lifecycle.generation();

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert!(third > second && second > first);
    }

    #[test]
    fn double_loss_is_rejected() {
        let mut lifecycle = DeviceLifecycle::new();
        lifecycle.initialized().unwrap();
        lifecycle.lost().unwrap();

        let err = lifecycle.lost().unwrap_err();
        assert_eq!(err.from, LifecycleState::Lost);
    }

    #[test]
    fn restore_without_a_loss_is_rejected() {
        let mut lifecycle = DeviceLifecycle::new();
        lifecycle.initialized().unwrap();
        assert!(lifecycle.restore_started().is_err());
        assert!(lifecycle.restored().is_err());
    }

    #[test]
    fn initialise_twice_is_rejected() {
        let mut lifecycle = DeviceLifecycle::new();
        lifecycle.initialized().unwrap();
        let err = lifecycle.initialized().unwrap_err();
        assert_eq!(err.from, LifecycleState::Ready);
    }

    #[test]
    fn losing_an_uninitialised_device_is_rejected() {
        let mut lifecycle = DeviceLifecycle::new();
        assert!(lifecycle.lost().is_err());
    }
}
