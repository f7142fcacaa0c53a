//! Command classification and routing.
//!
//! The router decides, per command type, where the handler runs:
//!
//! 1. static read-only operations run on the session thread;
//! 2. `create_locator` starts the multi-tick locator workflow;
//! 3. static mutating operations and mutating registry entries go through the
//!    task handoff to the owner thread;
//! 4. read-only registry entries run on the session thread;
//! 5. anything else is an unknown command.
//!
//! With `serialise_reads` enabled, steps 1 and 4 also use the handoff. Every
//! path is wrapped in a panic boundary so each command produces exactly one
//! response.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use cuebridge_config::Config;

use crate::handoff::{PendingResult, TaskHandoff, WaitError, panic_message, run_guarded};
use crate::host::Host;
use crate::operations::{self, Operation, OperationResult, Params};
use crate::scheduler::OwnerScheduler;
use crate::workflow::{LocatorRequest, WorkflowEngine};

use super::errors::DispatchError;
use super::registry::{CommandRegistry, Handler};
use super::request::Command;
use super::response::Response;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Command type that starts the locator workflow.
pub const CREATE_LOCATOR: &str = "create_locator";

const OPERATION_WAIT: &str = "operation to complete";
const DYNAMIC_WAIT: &str = "dynamic operation";
const LOCATOR_WAIT: &str = "locator creation";

/// Routing class of a command type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandClass {
    ReadOnly,
    Workflow,
    Mutating,
    DynamicMutating,
    DynamicReadOnly,
    Unknown,
}

impl CommandClass {
    fn is_mutating(self) -> bool {
        matches!(self, Self::Mutating | Self::DynamicMutating)
    }

    fn wait_label(self) -> &'static str {
        match self {
            Self::DynamicMutating | Self::DynamicReadOnly => DYNAMIC_WAIT,
            Self::Workflow => LOCATOR_WAIT,
            Self::ReadOnly | Self::Mutating | Self::Unknown => OPERATION_WAIT,
        }
    }
}

enum Target {
    Static(Operation),
    Dynamic(Handler),
}

impl Target {
    fn invoke(&self, host: &dyn Host, params: &Params) -> OperationResult {
        match self {
            Self::Static(operation) => operation(host, params),
            Self::Dynamic(handler) => handler(host, params),
        }
    }
}

enum Resolved {
    Locator,
    Invoke { class: CommandClass, target: Target },
    Unknown,
}

/// Tunables for [`CommandRouter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterOptions {
    /// Deadline for handoff and workflow results.
    pub response_timeout: Duration,
    /// Route read-only commands through the owner thread too.
    pub serialise_reads: bool,
}

impl RouterOptions {
    /// Options taken from the daemon configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            response_timeout: config.response_timeout(),
            serialise_reads: config.serialise_reads(),
        }
    }
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Routes commands to handlers on the right thread.
pub struct CommandRouter {
    host: Arc<dyn Host>,
    handoff: TaskHandoff,
    workflows: Arc<WorkflowEngine>,
    registry: Arc<CommandRegistry>,
    options: RouterOptions,
}

impl CommandRouter {
    /// Builds a router with the bundled dynamic commands registered.
    pub fn new(
        host: Arc<dyn Host>,
        scheduler: Arc<dyn OwnerScheduler>,
        options: RouterOptions,
    ) -> Self {
        let workflows = Arc::new(WorkflowEngine::new(
            Arc::clone(&host),
            Arc::clone(&scheduler),
        ));
        let registry = Arc::new(CommandRegistry::with_defaults(Arc::clone(&workflows)));
        debug!(
            target: DISPATCH_TARGET,
            built_in = ?operations::names().collect::<Vec<_>>(),
            registered = ?registry.names(),
            serialise_reads = options.serialise_reads,
            "command router ready"
        );
        Self {
            host,
            handoff: TaskHandoff::new(scheduler),
            workflows,
            registry,
            options,
        }
    }

    /// Dynamic registry shared with anything that wants to hot-load commands.
    #[must_use]
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn workflows(&self) -> &Arc<WorkflowEngine> {
        &self.workflows
    }

    /// Routing class of `kind` under the current registry snapshot.
    #[must_use]
    pub fn classify(&self, kind: &str) -> CommandClass {
        match self.resolve(kind) {
            Resolved::Locator => CommandClass::Workflow,
            Resolved::Invoke { class, .. } => class,
            Resolved::Unknown => CommandClass::Unknown,
        }
    }

    /// Runs a command and produces its response. Never panics.
    pub fn route(&self, command: Command) -> Response {
        let kind = command.kind().to_owned();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(command)))
            .unwrap_or_else(|payload| Err(DispatchError::internal(panic_message(&*payload))));
        if let Err(error) = &outcome {
            debug!(
                target: DISPATCH_TARGET,
                command = %kind,
                %error,
                "command failed"
            );
        }
        Response::from(outcome)
    }

    fn resolve(&self, kind: &str) -> Resolved {
        if let Some(operation) = operations::read_only(kind) {
            return Resolved::Invoke {
                class: CommandClass::ReadOnly,
                target: Target::Static(operation),
            };
        }
        if kind == CREATE_LOCATOR {
            return Resolved::Locator;
        }
        if let Some(operation) = operations::mutating(kind) {
            return Resolved::Invoke {
                class: CommandClass::Mutating,
                target: Target::Static(operation),
            };
        }
        match self.registry.lookup(kind) {
            Some(entry) => Resolved::Invoke {
                class: if entry.is_mutating() {
                    CommandClass::DynamicMutating
                } else {
                    CommandClass::DynamicReadOnly
                },
                target: Target::Dynamic(entry.handler()),
            },
            None => Resolved::Unknown,
        }
    }

    fn dispatch(&self, command: Command) -> Result<Value, DispatchError> {
        let (kind, params) = command.into_parts();
        match self.resolve(&kind) {
            Resolved::Locator => {
                debug!(target: DISPATCH_TARGET, command = %kind, "starting locator workflow");
                let request = LocatorRequest::from_params(&params)?;
                let pending = self.workflows.create_locator(request);
                self.await_result(pending, CommandClass::Workflow.wait_label())
            }
            Resolved::Invoke { class, target } => {
                debug!(target: DISPATCH_TARGET, command = %kind, ?class, "routing command");
                if class.is_mutating() || self.options.serialise_reads {
                    let host = Arc::clone(&self.host);
                    let pending = self
                        .handoff
                        .submit(move || target.invoke(host.as_ref(), &params));
                    self.await_result(pending, class.wait_label())
                } else {
                    run_guarded(|| target.invoke(self.host.as_ref(), &params))
                        .map_err(DispatchError::from)
                }
            }
            Resolved::Unknown => Err(DispatchError::unknown_command(kind)),
        }
    }

    fn await_result(
        &self,
        pending: PendingResult,
        what: &'static str,
    ) -> Result<Value, DispatchError> {
        match pending.wait(self.options.response_timeout) {
            Ok(result) => result.map_err(DispatchError::from),
            Err(WaitError::Timeout { waited }) => {
                warn!(
                    target: DISPATCH_TARGET,
                    waited_ms = waited.as_millis(),
                    what,
                    "owner thread missed the response deadline"
                );
                Err(DispatchError::timeout(what, waited))
            }
            Err(WaitError::Disconnected) => Err(DispatchError::OwnerUnavailable),
        }
    }
}
