//! Build-wide constants.
//!
//! Defaults applied when the topology file leaves a value out, plus the file and
//! environment names the binary uses.

/// Subnet size requested when a segment does not set one (128 addresses).
pub const DEFAULT_SUBNET_PREFIX: u8 = 25;
/// Smallest subnet Azure accepts.
pub const MAX_SUBNET_PREFIX: u8 = 29;

/// Azure requires these exact subnet names.
pub const FIREWALL_SUBNET_NAME: &str = "AzureFirewallSubnet";
pub const GATEWAY_SUBNET_NAME: &str = "GatewaySubnet";
pub const APP_GATEWAY_SUBNET_NAME: &str = "AppGatewaySubnet";

// NSG rule numbering
pub const BASE_RULE_PRIORITY: u32 = 200;
pub const RULE_PRIORITY_STEP: u32 = 10;
pub const MIN_RULE_PRIORITY: u32 = 100;
pub const MAX_RULE_PRIORITY: u32 = 4096;

// VM defaults, uniform across every fleet
pub const VM_SIZE: &str = "Standard_B1ms";
pub const OS_DISK_TYPE: &str = "Standard_LRS";
pub const OS_DISK_SIZE_GB: u32 = 30;
pub const OS_DISK_CACHING: &str = "ReadWrite";
pub const OS_TYPE: &str = "Linux";
pub const IMAGE_PUBLISHER: &str = "Canonical";
pub const IMAGE_OFFER: &str = "UbuntuServer";
pub const IMAGE_SKU: &str = "18.04-LTS";
pub const IMAGE_VERSION: &str = "latest";
pub const NIC_IP_CONFIG_NAME: &str = "ipconfig1";

// Load balancer defaults
pub const LB_DEFAULT_SKU: &str = "Basic";
pub const LB_DEFAULT_PORT: u16 = 80;
pub const LB_PROBE_INTERVAL_SECS: u32 = 5;

/// Azure keeps the first four addresses of each subnet; the firewall takes the next.
pub const FIREWALL_HOST_OFFSET: u32 = 4;

// Binary settings
pub const LOG_CONFIG_FILE: &str = "log4rs.yml";
pub const ENV_TOPOLOGY_SPEC: &str = "TOPOLOGY_SPEC";
pub const ENV_OUTPUT_DIR: &str = "TOPOLOGY_OUTPUT_DIR";
pub const DEFAULT_SPEC_FILE: &str = "topology.json";
