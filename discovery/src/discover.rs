//! Two-level enumeration of dumpable operations.
//!
//! Services are read from the tool's root help, subcommands from each
//! service's help. A pair reaches the caller only after three independent
//! checks: the service help can be fetched, the subcommand is a `list-` or
//! `describe-` operation whose own help can be fetched, and running it bare
//! exits zero in the current account.
//!
//! Everything is lazy: each step may invoke the tool, and nothing is probed
//! until the consumer pulls the next item. Order follows the help text,
//! depth-first.

use dumptruck_core::{
    DumpConfig, DumpError, Result, ServiceName, SubcommandName, ValidatedOperation,
};
use tracing::{debug, info};

use crate::oracle::ValidationOracle;
use crate::runner::Runner;
use crate::scanner::scan;

/// Enumerates services and their runnable list/describe subcommands.
pub struct DiscoveryEngine<R> {
    oracle: ValidationOracle<R>,
    config: DumpConfig,
}

impl<R: Runner> DiscoveryEngine<R> {
    pub fn new(runner: R, config: &DumpConfig) -> Self {
        Self {
            oracle: ValidationOracle::new(runner, config),
            config: config.clone(),
        }
    }

    pub fn oracle(&self) -> &ValidationOracle<R> {
        &self.oracle
    }

    /// Valid services in root help order.
    ///
    /// Names outside the service allowlist are skipped before any probe runs.
    /// Names whose help cannot be fetched are dropped with a debug line.
    ///
    /// # Errors
    ///
    /// Fails only if the root help itself cannot be fetched.
    pub fn list_services(&self) -> Result<impl Iterator<Item = ServiceName> + '_> {
        let root = self.oracle.root_help()?;
        let names = scan(root.to_vec(), &self.config.services_marker);
        Ok(names
            .filter_map(|name| ServiceName::new(name).ok())
            .filter(move |service| self.config.is_service_selected(service.as_str()))
            .filter(move |service| {
                let valid = self.oracle.service_is_valid(service);
                if !valid {
                    debug!(service = %service, "invalid service name");
                }
                valid
            }))
    }

    /// `list-`/`describe-` subcommands of `service` whose help can be fetched.
    ///
    /// # Errors
    ///
    /// Returns [`DumpError::MalformedPrecondition`] if `service` does not
    /// validate; callers must only pass services from [`list_services`].
    ///
    /// [`list_services`]: Self::list_services
    pub fn list_service_commands<'a>(
        &'a self,
        service: &ServiceName,
    ) -> Result<impl Iterator<Item = (ServiceName, SubcommandName)> + use<'a, R>> {
        if !self.oracle.service_is_valid(service) {
            return Err(DumpError::MalformedPrecondition(format!(
                "subcommand discovery on unvalidated service {service}"
            )));
        }
        let doc = self.oracle.help_doc(&[service.as_str()])?;
        let service = service.clone();
        let names = scan(doc.to_vec(), &self.config.commands_marker);
        Ok(names
            .filter_map(|name| SubcommandName::new(name).ok())
            .filter_map(move |subcommand| {
                if !subcommand.is_dump_candidate() {
                    debug!(service = %service, subcommand = %subcommand, "skipping");
                    return None;
                }
                if !self.oracle.subcommand_is_valid(&service, &subcommand) {
                    debug!(service = %service, subcommand = %subcommand, "invalid subcommand");
                    return None;
                }
                Some((service.clone(), subcommand))
            }))
    }

    /// Final gate for a pair from [`list_service_commands`]: a bare run must
    /// exit zero, since listed help does not imply the account may call it.
    ///
    /// [`list_service_commands`]: Self::list_service_commands
    pub fn runnable_operation(
        &self,
        service: ServiceName,
        subcommand: SubcommandName,
    ) -> Option<ValidatedOperation> {
        if self
            .oracle
            .operation_is_runnable(&[service.as_str(), subcommand.as_str()])
        {
            Some(ValidatedOperation {
                service,
                subcommand,
            })
        } else {
            None
        }
    }

    /// Every operation worth capturing, depth-first in help order.
    ///
    /// Each pair from [`list_service_commands`] must also pass
    /// [`runnable_operation`].
    ///
    /// [`list_service_commands`]: Self::list_service_commands
    /// [`runnable_operation`]: Self::runnable_operation
    pub fn list_valid_dump_commands(
        &self,
    ) -> Result<impl Iterator<Item = Result<ValidatedOperation>> + '_> {
        let services = self.list_services()?;
        Ok(services.flat_map(move |service| {
            info!(service = %service, "entering service");
            let commands: Box<dyn Iterator<Item = Result<ValidatedOperation>> + '_> =
                match self.list_service_commands(&service) {
                    Ok(commands) => Box::new(commands.filter_map(move |(service, subcommand)| {
                        info!(service = %service, subcommand = %subcommand, "entering subcommand");
                        let op = self.runnable_operation(service, subcommand)?;
                        info!(service = %op.service, subcommand = %op.subcommand, "command validated");
                        Some(Ok(op))
                    })),
                    Err(e) => Box::new(std::iter::once(Err(e))),
                };
            commands
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTool, root_help, service_help};

    fn pairs(engine: &DiscoveryEngine<&FakeTool>) -> Vec<(String, String)> {
        engine
            .list_valid_dump_commands()
            .unwrap()
            .map(|op| {
                let op = op.unwrap();
                (op.service.to_string(), op.subcommand.to_string())
            })
            .collect()
    }

    fn two_service_tool() -> FakeTool {
        FakeTool::new()
            .ok(&["help"], &root_help(&["ec2", "iam"]))
            .ok(&["ec2", "help"], &service_help("ec2", &["describe-vpcs", "run-instances", "list-keys"]))
            .ok(&["iam", "help"], &service_help("iam", &["list-users", "get-user"]))
            .ok(&["ec2", "describe-vpcs"], "{}")
            .ok(&["ec2", "list-keys"], "{}")
            .ok(&["iam", "list-users"], "{}")
    }

    #[test]
    fn test_list_services_in_help_order() {
        let tool = two_service_tool();
        let engine = DiscoveryEngine::new(&tool, &DumpConfig::default());
        let services: Vec<String> = engine.list_services().unwrap().map(|s| s.to_string()).collect();
        assert_eq!(services, vec!["ec2", "iam"]);
    }

    #[test]
    fn test_invalid_services_are_dropped() {
        let tool = two_service_tool().timeout(&["ec2", "help"]);
        let engine = DiscoveryEngine::new(&tool, &DumpConfig::default());
        let services: Vec<String> = engine.list_services().unwrap().map(|s| s.to_string()).collect();
        assert_eq!(services, vec!["iam"]);
    }

    #[test]
    fn test_root_help_failure_is_fatal() {
        let tool = FakeTool::new().timeout(&["help"]);
        let engine = DiscoveryEngine::new(&tool, &DumpConfig::default());
        assert!(matches!(engine.list_services(), Err(DumpError::Timeout { .. })));
    }

    #[test]
    fn test_list_service_commands_keeps_list_and_describe_only() {
        let tool = two_service_tool();
        let engine = DiscoveryEngine::new(&tool, &DumpConfig::default());
        let ec2 = ServiceName::new("ec2").unwrap();
        let subs: Vec<String> = engine
            .list_service_commands(&ec2)
            .unwrap()
            .map(|(_, sub)| sub.to_string())
            .collect();
        assert_eq!(subs, vec!["describe-vpcs", "list-keys"]);
        assert_eq!(tool.calls_to(&["ec2", "run-instances", "help"]), 0);
    }

    #[test]
    fn test_list_service_commands_rejects_unvalidated_service() {
        let tool = two_service_tool().timeout(&["s3", "help"]);
        let engine = DiscoveryEngine::new(&tool, &DumpConfig::default());
        let s3 = ServiceName::new("s3").unwrap();
        assert!(matches!(
            engine.list_service_commands(&s3),
            Err(DumpError::MalformedPrecondition(_))
        ));
    }

    #[test]
    fn test_all_three_checks_gate_a_pair() {
        let tool = two_service_tool();
        let engine = DiscoveryEngine::new(&tool, &DumpConfig::default());
        assert_eq!(
            pairs(&engine),
            vec![
                ("ec2".to_string(), "describe-vpcs".to_string()),
                ("ec2".to_string(), "list-keys".to_string()),
                ("iam".to_string(), "list-users".to_string()),
            ]
        );

        // (a) service validity
        let tool = two_service_tool().timeout(&["iam", "help"]);
        let engine = DiscoveryEngine::new(&tool, &DumpConfig::default());
        assert!(!pairs(&engine).iter().any(|(svc, _)| svc == "iam"));

        // (b) subcommand prefix
        let tool = two_service_tool().ok(&["iam", "get-user"], "{}");
        let engine = DiscoveryEngine::new(&tool, &DumpConfig::default());
        assert!(!pairs(&engine).iter().any(|(_, sub)| sub == "get-user"));

        // (c) final runnability probe
        let tool = two_service_tool().exit(&["ec2", "list-keys"], 254, "AccessDenied");
        let engine = DiscoveryEngine::new(&tool, &DumpConfig::default());
        let found = pairs(&engine);
        assert!(!found.iter().any(|(_, sub)| sub == "list-keys"));
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_subcommand_help_failure_drops_pair() {
        let tool = two_service_tool().timeout(&["ec2", "describe-vpcs", "help"]);
        let engine = DiscoveryEngine::new(&tool, &DumpConfig::default());
        let found = pairs(&engine);
        assert!(!found.iter().any(|(_, sub)| sub == "describe-vpcs"));
        assert_eq!(tool.calls_to(&["ec2", "describe-vpcs"]), 0);
    }

    #[test]
    fn test_bullets_after_section_end_are_ignored() {
        let tool = two_service_tool().ok(&["ec2", "list-after-section"], "{}");
        let engine = DiscoveryEngine::new(&tool, &DumpConfig::default());
        assert!(!pairs(&engine).iter().any(|(_, sub)| sub == "list-after-section"));
    }

    #[test]
    fn test_service_allowlist_skips_probes() {
        let tool = two_service_tool();
        let config = DumpConfig {
            services: vec!["iam".to_string()],
            ..DumpConfig::default()
        };
        let engine = DiscoveryEngine::new(&tool, &config);
        assert_eq!(pairs(&engine), vec![("iam".to_string(), "list-users".to_string())]);
        assert_eq!(tool.calls_to(&["ec2", "help"]), 0);
    }

    #[test]
    fn test_enumeration_is_lazy() {
        let tool = two_service_tool();
        let engine = DiscoveryEngine::new(&tool, &DumpConfig::default());
        let mut ops = engine.list_valid_dump_commands().unwrap();
        let first = ops.next().unwrap().unwrap();
        assert_eq!(first.subcommand.as_str(), "describe-vpcs");
        assert_eq!(tool.calls_to(&["iam", "help"]), 0);
    }

    #[test]
    fn test_help_documents_are_fetched_once() {
        let tool = two_service_tool();
        let engine = DiscoveryEngine::new(&tool, &DumpConfig::default());
        pairs(&engine);
        assert_eq!(tool.calls_to(&["help"]), 1);
        assert_eq!(tool.calls_to(&["ec2", "help"]), 1);
        assert_eq!(tool.calls_to(&["iam", "help"]), 1);
    }

    #[test]
    fn test_runnable_operation_requires_zero_exit() {
        let tool = two_service_tool().exit(&["ec2", "list-keys"], 255, "");
        let engine = DiscoveryEngine::new(&tool, &DumpConfig::default());
        let ec2 = ServiceName::new("ec2").unwrap();

        let op = engine
            .runnable_operation(ec2.clone(), SubcommandName::new("describe-vpcs").unwrap())
            .unwrap();
        assert_eq!(op.to_string(), "ec2 describe-vpcs");
        assert!(
            engine
                .runnable_operation(ec2, SubcommandName::new("list-keys").unwrap())
                .is_none()
        );
    }

    #[test]
    fn test_path_like_names_never_reach_capture() {
        let tool = FakeTool::new()
            .ok(&["help"], &root_help(&["../etc", "ec2"]))
            .ok(&["ec2", "help"], &service_help("ec2", &["list-../../x", "list-keys"]))
            .ok(&["ec2", "list-keys"], "{}");
        let engine = DiscoveryEngine::new(&tool, &DumpConfig::default());
        assert_eq!(pairs(&engine), vec![("ec2".to_string(), "list-keys".to_string())]);
        assert_eq!(tool.calls_to(&["../etc", "help"]), 0);
    }
}
