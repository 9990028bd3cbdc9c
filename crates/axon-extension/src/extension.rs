//! The Extension trait.
//!
//! An extension is the unit of user logic: it receives the messages
//! routed to its [`Loc`](axon_types::Loc) and may emit messages of its
//! own. All callbacks run on the owning engine's loop, one at a time —
//! an extension never needs internal locking for its own state.
//!
//! # Lifecycle
//!
//! ```text
//! on_init ──► on_start ──► (messages...) ──► on_stop ──► on_deinit
//! ```
//!
//! Lifecycle hooks are defaulted; most extensions only implement the
//! message callbacks they care about.
//!
//! # Example
//!
//! ```
//! use axon_extension::{Extension, ExtensionError};
//! use axon_msg::{Cmd, CmdResult, StatusCode};
//!
//! struct Echo;
//!
//! impl Extension for Echo {
//!     fn name(&self) -> &str {
//!         "echo"
//!     }
//!
//!     fn on_cmd(&mut self, cmd: Cmd) -> Result<CmdResult, ExtensionError> {
//!         Ok(CmdResult::for_cmd(&cmd, StatusCode::Ok))
//!     }
//! }
//! ```

use crate::ExtensionError;
use axon_msg::{AudioFrame, Cmd, CmdResult, Data, VideoFrame};

/// A unit of user logic addressed by a `Loc`.
pub trait Extension: Send {
    /// The extension's name within its group.
    fn name(&self) -> &str;

    /// Called once before the extension receives any message.
    ///
    /// # Errors
    ///
    /// An error aborts graph startup for this extension.
    fn on_init(&mut self) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Called when the hosting graph starts routing.
    ///
    /// # Errors
    ///
    /// An error aborts graph startup for this extension.
    fn on_start(&mut self) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Called when the hosting graph stops routing.
    fn on_stop(&mut self) {}

    /// Called once after the last message, before the extension drops.
    fn on_deinit(&mut self) {}

    /// Handles a command routed to this extension.
    ///
    /// # Errors
    ///
    /// Errors are translated into an error-status result for the
    /// command's requester.
    fn on_cmd(&mut self, cmd: Cmd) -> Result<CmdResult, ExtensionError>;

    /// Handles a (possibly partial) result for a command this extension
    /// sent. Default: drop it.
    fn on_cmd_result(&mut self, _result: CmdResult) {}

    /// Handles a data message. Default: drop it.
    fn on_data(&mut self, _data: Data) {}

    /// Handles an audio frame. Default: drop it.
    fn on_audio_frame(&mut self, _frame: AudioFrame) {}

    /// Handles a video frame. Default: drop it.
    fn on_video_frame(&mut self, _frame: VideoFrame) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_msg::StatusCode;

    struct Counter {
        cmds: usize,
        datas: usize,
    }

    impl Extension for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn on_cmd(&mut self, cmd: Cmd) -> Result<CmdResult, ExtensionError> {
            self.cmds += 1;
            Ok(CmdResult::for_cmd(&cmd, StatusCode::Ok))
        }

        fn on_data(&mut self, _data: Data) {
            self.datas += 1;
        }
    }

    #[test]
    fn defaulted_lifecycle_is_a_noop() {
        let mut ext = Counter { cmds: 0, datas: 0 };
        assert!(ext.on_init().is_ok());
        assert!(ext.on_start().is_ok());
        ext.on_stop();
        ext.on_deinit();
    }

    #[test]
    fn callbacks_dispatch() {
        let mut ext = Counter { cmds: 0, datas: 0 };
        ext.on_cmd(Cmd::new("x")).unwrap();
        ext.on_data(Data::new("d"));
        ext.on_audio_frame(AudioFrame::new("a")); // defaulted drop
        assert_eq!((ext.cmds, ext.datas), (1, 1));
    }
}
