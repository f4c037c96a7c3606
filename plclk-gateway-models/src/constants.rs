/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "plclk-gateway.toml";

/// Default control endpoint path.
pub const DEFAULT_SOCKET_PATH: &str = "/run/plclk-gateway.sock";

/// Default platform configuration tree location (flattened, one directory
/// per node, one file per property).
pub const DEFAULT_TREE_DIR: &str = "/proc/device-tree";

/// Default clock provider control directory (one subdirectory per output).
pub const DEFAULT_PROVIDER_DIR: &str = "/sys/kernel/debug/clk";

/// Provider compatibility string of the platform clock controller.
pub const DEFAULT_PROVIDER_COMPATIBLE: &str = "xlnx,zynqmp-clkc";

/// Clock output managed when the configuration does not name another.
pub const DEFAULT_OUTPUT_NAME: &str = "pl0";
