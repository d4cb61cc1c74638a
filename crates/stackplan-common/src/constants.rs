//! System-wide constants and planning defaults.

/// Binary name for the CLI.
pub const BIN_NAME: &str = "stackplan";

/// Default manifest file looked up by the CLI.
pub const DEFAULT_MANIFEST: &str = "stackplan.yaml";

/// Default address space of the planned network.
pub const DEFAULT_NETWORK_CIDR: &str = "10.0.0.0/16";

/// Default number of availability zones the network spans.
pub const DEFAULT_MAX_AZS: u8 = 2;

/// Default display name of the orchestration cluster.
pub const DEFAULT_CLUSTER_NAME: &str = "Services";

/// Default name of the shared load balancer.
pub const DEFAULT_LOAD_BALANCER_NAME: &str = "ServicesLB";

/// Default port the load balancer listener accepts traffic on.
pub const DEFAULT_LISTENER_PORT: u16 = 80;

/// Default task CPU units.
pub const DEFAULT_CPU_UNITS: u32 = 256;

/// Default task memory in MiB.
pub const DEFAULT_MEMORY_MIB: u32 = 512;

/// Default image tag when a service does not pin one.
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Default TTL of the alias record, in seconds.
pub const DEFAULT_DNS_TTL_SECONDS: i64 = 300;

/// Lowest routing rule priority accepted by the load balancer.
pub const MIN_RULE_PRIORITY: u32 = 1;

/// Highest routing rule priority accepted by the load balancer.
pub const MAX_RULE_PRIORITY: u32 = 50_000;

/// Maximum length of a target group name.
pub const MAX_TARGET_GROUP_NAME_LEN: usize = 32;

/// Suffix appended to a service name to derive its target group name.
pub const TARGET_GROUP_SUFFIX: &str = "-tg";

/// Maximum length of a service name.
///
/// The derived target group name must fit in [`MAX_TARGET_GROUP_NAME_LEN`].
pub const MAX_SERVICE_NAME_LEN: usize = MAX_TARGET_GROUP_NAME_LEN - TARGET_GROUP_SUFFIX.len();

/// Maximum length of a load balancer name.
pub const MAX_LOAD_BALANCER_NAME_LEN: usize = 32;

/// Maximum length of a path pattern condition.
pub const MAX_PATH_PATTERN_LEN: usize = 128;

/// Maximum number of availability zones a network may span.
pub const MAX_AZS: u8 = 6;

/// Network mode used by every task definition.
pub const TASK_NETWORK_MODE: &str = "awsvpc";

/// Launch compatibility of every task definition.
pub const TASK_COMPATIBILITY: &str = "EC2_AND_FARGATE";

/// Identifier prefix of container registry repositories.
pub const IMAGE_REGISTRY_PREFIX: &str = "arn:aws:ecr:";

/// Identifier prefix of externally managed load balancers.
pub const LOAD_BALANCER_PREFIX: &str = "arn:aws:elasticloadbalancing:";
