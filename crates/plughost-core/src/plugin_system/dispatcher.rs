use std::sync::Arc;

use crate::harness::invoker::{Invocation, InvocationOutcome, TimeoutInvoker};
use crate::harness::report::CapabilityResult;
use crate::plugin_system::capabilities::{
    Availability, Capability, CapabilityError, CapabilityResult as CallResult, PluginCapabilities,
};
use crate::plugin_system::contract::ContractGate;
use crate::plugin_system::models::{
    ContactQueryParams, Credentials, LedgerQueryParams, PluginMetadata,
};

/// Report entry name used when the contract check rejects an artifact.
pub const CONTRACT_ENTRY: &str = "Contract";

/// Read-only inputs handed to the domain capabilities.
#[derive(Debug, Clone, Default)]
pub struct DispatchInputs {
    pub credentials: Credentials,
    pub contact_params: ContactQueryParams,
    pub ledger_params: LedgerQueryParams,
}

/// What a dispatch pass produced for one artifact.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub funcs: Vec<CapabilityResult>,
    /// Set when the declared contract was rejected; nothing else ran.
    pub contract_rejected: bool,
    pub metadata: Option<PluginMetadata>,
}

/// Drives the capability protocol against one opened artifact.
///
/// Order is fixed: `Meta` (with the contract check), `Health`, `RunTests`,
/// `Contacts`, `Ledger`. Every call goes through the [`TimeoutInvoker`].
#[derive(Debug, Clone)]
pub struct CapabilityDispatcher {
    gate: ContractGate,
    inputs: Arc<DispatchInputs>,
    invoker: TimeoutInvoker,
}

impl CapabilityDispatcher {
    pub fn new(gate: ContractGate, inputs: Arc<DispatchInputs>, invoker: TimeoutInvoker) -> Self {
        Self { gate, inputs, invoker }
    }

    pub fn gate(&self) -> &ContractGate {
        &self.gate
    }

    pub fn invoker(&self) -> &TimeoutInvoker {
        &self.invoker
    }

    pub async fn dispatch(&self, plugin: &Arc<dyn PluginCapabilities>) -> DispatchOutcome {
        let mut funcs = Vec::with_capacity(Capability::CANONICAL_ORDER.len());

        let (meta_result, metadata) = self
            .invoke_capability(plugin, Capability::Meta, |plugin, _| plugin.meta())
            .await;
        if let Some(meta) = &metadata {
            let declared = meta.contract_version.trim();
            if !declared.is_empty() && !self.gate.is_compatible(declared) {
                let reason = self.gate.incompatibility_reason(declared);
                log::warn!("Plugin '{}' rejected: {}", meta.name, reason);
                let rejected =
                    CapabilityResult::instant(CONTRACT_ENTRY, InvocationOutcome::Error(reason));
                return DispatchOutcome {
                    funcs: vec![rejected],
                    contract_rejected: true,
                    metadata,
                };
            }
        }
        funcs.push(meta_result);

        let (health, _) = self
            .invoke_capability(plugin, Capability::Health, |plugin, _| {
                let status = plugin.health()?;
                if status.trim() == "ok" {
                    Ok(())
                } else {
                    Err(CapabilityError::new(format!("unhealthy status '{}'", status)))
                }
            })
            .await;
        funcs.push(health);

        let (run_tests, _) = self
            .invoke_capability(plugin, Capability::RunTests, |plugin, _| plugin.run_tests())
            .await;
        funcs.push(run_tests);

        let (contacts, _) = self
            .invoke_capability(plugin, Capability::Contacts, |plugin, inputs| {
                plugin.contacts(&inputs.credentials, &inputs.contact_params)
            })
            .await;
        funcs.push(contacts);

        let (ledger, _) = self
            .invoke_capability(plugin, Capability::Ledger, |plugin, inputs| {
                plugin.ledger(&inputs.credentials, &inputs.ledger_params)
            })
            .await;
        funcs.push(ledger);

        DispatchOutcome { funcs, contract_rejected: false, metadata }
    }

    async fn invoke_capability<T, F>(
        &self,
        plugin: &Arc<dyn PluginCapabilities>,
        capability: Capability,
        call: F,
    ) -> (CapabilityResult, Option<T>)
    where
        F: FnOnce(&dyn PluginCapabilities, &DispatchInputs) -> CallResult<T> + Send + 'static,
        T: Send + 'static,
    {
        match plugin.availability(capability) {
            Availability::Available => {
                let handle = Arc::clone(plugin);
                let inputs = Arc::clone(&self.inputs);
                let invocation = self
                    .invoker
                    .invoke(capability.name(), move || call(handle.as_ref(), &inputs))
                    .await;
                let Invocation { outcome, value, elapsed } = invocation;
                (CapabilityResult::new(capability.name(), outcome, elapsed), value)
            }
            availability => {
                let outcome = unavailable_outcome(capability, &availability);
                (CapabilityResult::instant(capability.name(), outcome), None)
            }
        }
    }
}

fn unavailable_outcome(capability: Capability, availability: &Availability) -> InvocationOutcome {
    match availability {
        Availability::Missing if capability.is_optional() => InvocationOutcome::Skipped,
        Availability::Missing => InvocationOutcome::Missing,
        Availability::InvalidSignature => InvocationOutcome::Error("invalid signature".to_string()),
        Availability::Available => InvocationOutcome::Ok,
    }
}
