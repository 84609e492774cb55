//! Remote command dispatch.
//!
//! A static table maps action names to their required argument count.
//! Dispatch itself is pure: it mutates the shared display name for `rename`
//! and reports everything else as an outcome for the caller to log, publish,
//! and forward to the supervisor.

use fleetpulse_common::wire::CommandMessage;
use parking_lot::Mutex;

/// Lifecycle requests forwarded to the agent supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Shutdown,
    Restart,
}

#[derive(Clone, Copy)]
enum ActionKind {
    Rename,
    Shutdown,
    Restart,
}

struct CommandSpec {
    name: &'static str,
    arity: usize,
    kind: ActionKind,
}

const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "rename", arity: 1, kind: ActionKind::Rename },
    CommandSpec { name: "shutdown", arity: 0, kind: ActionKind::Shutdown },
    CommandSpec { name: "restart", arity: 0, kind: ActionKind::Restart },
];

#[derive(Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Renamed { from: String, to: String },
    Control(ControlEvent),
    /// Error-level: the message is dropped, never retried.
    ArityMismatch { action: String, expected: usize, got: usize },
    /// Warning-level: the message is dropped.
    UnknownAction { action: String },
}

pub fn dispatch(msg: CommandMessage, name: &Mutex<String>) -> DispatchOutcome {
    let Some(spec) = COMMANDS.iter().find(|c| c.name == msg.action) else {
        return DispatchOutcome::UnknownAction { action: msg.action };
    };
    if msg.args.len() != spec.arity {
        return DispatchOutcome::ArityMismatch {
            action: msg.action,
            expected: spec.arity,
            got: msg.args.len(),
        };
    }
    match spec.kind {
        ActionKind::Rename => {
            let to = msg.args.into_iter().next().unwrap_or_default();
            let from = std::mem::replace(&mut *name.lock(), to.clone());
            DispatchOutcome::Renamed { from, to }
        }
        ActionKind::Shutdown => DispatchOutcome::Control(ControlEvent::Shutdown),
        ActionKind::Restart => DispatchOutcome::Control(ControlEvent::Restart),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(action: &str, args: &[&str]) -> CommandMessage {
        CommandMessage {
            action: action.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn rename_swaps_the_display_name() {
        let name = Mutex::new("Node-OLD".to_string());
        let outcome = dispatch(msg("rename", &["Node-X"]), &name);
        assert_eq!(
            outcome,
            DispatchOutcome::Renamed { from: "Node-OLD".into(), to: "Node-X".into() }
        );
        assert_eq!(*name.lock(), "Node-X");
    }

    #[test]
    fn rename_without_args_is_rejected_and_name_unchanged() {
        let name = Mutex::new("Node-X".to_string());
        let outcome = dispatch(msg("rename", &[]), &name);
        assert_eq!(
            outcome,
            DispatchOutcome::ArityMismatch { action: "rename".into(), expected: 1, got: 0 }
        );
        assert_eq!(*name.lock(), "Node-X");
    }

    #[test]
    fn extra_args_are_an_arity_mismatch_too() {
        let name = Mutex::new("Node-X".to_string());
        let outcome = dispatch(msg("shutdown", &["now"]), &name);
        assert_eq!(
            outcome,
            DispatchOutcome::ArityMismatch { action: "shutdown".into(), expected: 0, got: 1 }
        );
    }

    #[test]
    fn shutdown_and_restart_become_control_events() {
        let name = Mutex::new(String::new());
        assert_eq!(
            dispatch(msg("shutdown", &[]), &name),
            DispatchOutcome::Control(ControlEvent::Shutdown)
        );
        assert_eq!(
            dispatch(msg("restart", &[]), &name),
            DispatchOutcome::Control(ControlEvent::Restart)
        );
    }

    #[test]
    fn unknown_action_is_dropped_with_warning() {
        let name = Mutex::new(String::new());
        assert_eq!(
            dispatch(msg("reboot", &[]), &name),
            DispatchOutcome::UnknownAction { action: "reboot".into() }
        );
    }
}
