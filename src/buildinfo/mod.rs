//! Static build metadata and the `buildinfo` report.
//!
//! Values are fixed at compile time. `build.rs` fills in the git SHA when a
//! checkout is available; packagers can set the remaining `MWTOOL_*`
//! variables when building.

use std::io::{self, Write};

const DEFAULT_MAX_BROKER_CLIENTS: u32 = 50_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub commit: String,
    pub build_date: String,
    pub license: String,
    pub max_broker_clients: u32,
    pub config_mutators: Vec<String>,
    pub provision_brokers: String,
    pub provision_default: bool,
    pub provision_tls: bool,
    pub provision_agent: bool,
    pub provision_registration_data: String,
    pub provision_facts: String,
    pub provision_target_resolver: String,
    pub provision_token_set: bool,
    pub agent_providers: Vec<String>,
    pub tls: bool,
    pub x509_secure: bool,
}

fn flag(value: Option<&str>, default: bool) -> bool {
    match value {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

fn list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn write_list<W: Write>(out: &mut W, items: &[String]) -> io::Result<()> {
    if items.is_empty() {
        return writeln!(out, "\tnone");
    }
    for item in items {
        writeln!(out, "\t{item}")?;
    }
    Ok(())
}

impl BuildInfo {
    /// Describe the running binary.
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            commit: option_env!("MWTOOL_GIT_SHA").unwrap_or("unknown").to_string(),
            build_date: option_env!("MWTOOL_BUILD_DATE")
                .unwrap_or("unknown")
                .to_string(),
            license: env!("CARGO_PKG_LICENSE").to_string(),
            max_broker_clients: option_env!("MWTOOL_MAX_BROKER_CLIENTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_BROKER_CLIENTS),
            config_mutators: list(option_env!("MWTOOL_CONFIG_MUTATORS")),
            provision_brokers: option_env!("MWTOOL_PROVISION_BROKERS")
                .unwrap_or("")
                .to_string(),
            provision_default: flag(option_env!("MWTOOL_PROVISION_DEFAULT"), false),
            provision_tls: flag(option_env!("MWTOOL_PROVISION_TLS"), true),
            provision_agent: flag(option_env!("MWTOOL_PROVISION_AGENT"), true),
            provision_registration_data: option_env!("MWTOOL_PROVISION_REGISTRATION_DATA")
                .unwrap_or("")
                .to_string(),
            provision_facts: option_env!("MWTOOL_PROVISION_FACTS")
                .unwrap_or("")
                .to_string(),
            provision_target_resolver: option_env!("MWTOOL_PROVISION_TARGET_RESOLVER")
                .unwrap_or("Default")
                .to_string(),
            provision_token_set: option_env!("MWTOOL_PROVISION_TOKEN")
                .map_or(false, |token| !token.is_empty()),
            agent_providers: list(option_env!("MWTOOL_AGENT_PROVIDERS")),
            tls: flag(option_env!("MWTOOL_TLS"), true),
            x509_secure: flag(option_env!("MWTOOL_X509_SECURITY"), true),
        }
    }

    /// True when both transport TLS and x509 message security are on.
    pub fn is_standard_security(&self) -> bool {
        self.tls && self.x509_secure
    }

    /// Write the human readable report.
    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "mwtool build settings:")?;
        writeln!(out)?;
        writeln!(out, "Build Data:")?;
        writeln!(out, "     Version: {}", self.version)?;
        writeln!(out, "     Git SHA: {}", self.commit)?;
        writeln!(out, "  Build Date: {}", self.build_date)?;
        writeln!(out, "     License: {}", self.license)?;
        writeln!(out)?;
        writeln!(out, "Network Broker Settings:")?;
        writeln!(out, "  Maximum Network Clients: {}", self.max_broker_clients)?;
        writeln!(out)?;
        writeln!(out, "Configuration Mutators:")?;
        write_list(out, &self.config_mutators)?;
        writeln!(out)?;
        writeln!(out, "Server Settings:")?;
        writeln!(out, "            Provisioning Brokers: {}", self.provision_brokers)?;
        writeln!(out, "            Provisioning Default: {}", self.provision_default)?;
        writeln!(out, "                Provisioning TLS: {}", self.provision_tls)?;
        writeln!(out, "      Default Provisioning Agent: {}", self.provision_agent)?;
        writeln!(
            out,
            "  Provisioning Registration Data: {}",
            self.provision_registration_data
        )?;
        writeln!(out, "              Provisioning Facts: {}", self.provision_facts)?;
        writeln!(
            out,
            "    Provisioning Target Resolver: {}",
            self.provision_target_resolver
        )?;
        let token = if self.provision_token_set { "set" } else { "not set" };
        writeln!(out, "              Provisioning Token: {token}")?;
        writeln!(out)?;
        writeln!(out, "Agent Providers:")?;
        write_list(out, &self.agent_providers)?;
        writeln!(out)?;
        writeln!(out, "Security Defaults:")?;
        writeln!(out, "            TLS: {}", self.tls)?;
        writeln!(out, "  x509 Security: {}", self.x509_secure)?;

        if !self.is_standard_security() {
            writeln!(out)?;
            writeln!(
                out,
                "NOTE: The security of this build is non standard, you might be running without \
                 adequate protocol level security. Please ensure this is the build you intend \
                 to be using."
            )?;
        }

        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BuildInfo {
        BuildInfo {
            version: "0.3.0".into(),
            commit: "abc1234".into(),
            build_date: "2026-10-01".into(),
            license: "MIT".into(),
            max_broker_clients: 50_000,
            config_mutators: vec!["facts".into(), "rightscale".into()],
            provision_brokers: "prov.example.net:4222".into(),
            provision_default: false,
            provision_tls: true,
            provision_agent: true,
            provision_registration_data: "/etc/mwtool/registration.json".into(),
            provision_facts: "/etc/mwtool/facts.json".into(),
            provision_target_resolver: "Default".into(),
            provision_token_set: false,
            agent_providers: vec!["golang".into(), "external".into()],
            tls: true,
            x509_secure: true,
        }
    }

    fn rendered(info: &BuildInfo) -> String {
        let mut out = Vec::new();
        info.render(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn report_lists_build_data_and_providers() {
        let text = rendered(&sample());
        assert!(text.starts_with("mwtool build settings:\n"));
        assert!(text.contains("     Version: 0.3.0\n"));
        assert!(text.contains("     Git SHA: abc1234\n"));
        assert!(text.contains("  Maximum Network Clients: 50000\n"));
        assert!(text.contains("Configuration Mutators:\n\tfacts\n\trightscale\n"));
        assert!(text.contains("Agent Providers:\n\tgolang\n\texternal\n"));
        assert!(text.contains("  x509 Security: true\n"));
        assert!(!text.contains("NOTE:"));

        let mut info = sample();
        info.config_mutators.clear();
        assert!(rendered(&info).contains("Configuration Mutators:\n\tnone\n\nServer Settings:"));
    }

    #[test]
    fn sections_follow_the_report_order() {
        let text = rendered(&sample());
        let positions: Vec<usize> = [
            "Build Data:",
            "Network Broker Settings:",
            "Configuration Mutators:",
            "Server Settings:",
            "Agent Providers:",
            "Security Defaults:",
        ]
        .iter()
        .map(|section| text.find(section).expect(section))
        .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn provisioning_settings_are_listed() {
        let mut info = sample();
        let text = rendered(&info);
        assert!(text.contains("                Provisioning TLS: true\n"));
        assert!(text.contains("      Default Provisioning Agent: true\n"));
        assert!(text.contains(
            "  Provisioning Registration Data: /etc/mwtool/registration.json\n"
        ));
        assert!(text.contains("              Provisioning Facts: /etc/mwtool/facts.json\n"));
        assert!(text.contains("    Provisioning Target Resolver: Default\n"));
        assert!(text.contains("              Provisioning Token: not set\n"));

        info.provision_token_set = true;
        assert!(rendered(&info).contains("              Provisioning Token: set\n"));
    }

    #[test]
    fn insecure_x509_gets_a_warning() {
        let mut info = sample();
        info.x509_secure = false;

        let text = rendered(&info);
        assert!(text.contains("            TLS: true\n  x509 Security: false\n"));
        assert!(text.contains("NOTE: The security of this build is non standard"));
    }

    #[test]
    fn insecure_build_gets_a_warning() {
        let mut info = sample();
        info.tls = false;
        info.agent_providers.clear();

        let text = rendered(&info);
        assert!(text.contains("Agent Providers:\n\tnone\n"));
        assert!(text.contains("            TLS: false\n"));
        assert!(text.contains("NOTE: The security of this build is non standard"));
    }

    #[test]
    fn current_reports_package_version() {
        let info = BuildInfo::current();
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(info.license, "MIT");
        assert!(info.max_broker_clients > 0);

        let text = rendered(&info);
        assert!(text.contains("Configuration Mutators:\n"));
        assert!(text.contains("    Provisioning Target Resolver: "));
        assert!(text.contains("  x509 Security: "));
    }

    #[test]
    fn flag_parsing() {
        assert!(flag(Some("TRUE"), false));
        assert!(flag(Some("1"), false));
        assert!(!flag(Some("no"), true));
        assert!(flag(None, true));
    }

    #[test]
    fn list_parsing() {
        assert!(list(None).is_empty());
        assert!(list(Some(" , ")).is_empty());
        assert_eq!(list(Some("facts, rightscale")), vec!["facts", "rightscale"]);
    }
}
