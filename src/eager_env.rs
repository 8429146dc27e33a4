use std::env;
use std::sync::LazyLock;

macro_rules! define_env_vars {
    ($(($name:ident, $env_name:expr, $type:ty, $default:expr)),* $(,)?) => {
        $(
            pub static $name: LazyLock<$type> = LazyLock::new(|| {
                match env::var($env_name) {
                    Ok(val) => val.parse::<$type>().unwrap_or_else(|_| {
                        panic!(
                            "Failed to parse environment variable {} with value '{}' as {}",
                            $env_name,
                            val,
                            stringify!($type)
                        )
                    }),
                    Err(_) => $default,
                }
            });
        )*

        /// Force initialization of all environment variables at startup
        /// Call this early in main() to fail fast if any env vars are malformed
        pub fn check_env() {
            $(
                let _ = *$name;
            )*
        }
    };
}

// Define all environment variables, with defaults matching the reference
// deployment (three workers on a docker network, balancer and workers on 5000)
define_env_vars!(
    (PORT, "PORT", u16, 5000),
    (WORKER_PORT, "WORKER_PORT", u16, 5000),
    (LB_NETWORK, "LB_NETWORK", String, String::from("lb_network")),
    (WORKER_IMAGE, "WORKER_IMAGE", String, String::from("server:latest")),
    (ENABLE_HEAL, "ENABLE_HEAL", bool, false),
    (HEALTH_INTERVAL_SECONDS, "HEALTH_INTERVAL_SECONDS", u64, 5),
    (PROBE_TIMEOUT_SECONDS, "PROBE_TIMEOUT_SECONDS", u64, 2),
    (PROXY_TIMEOUT_SECONDS, "PROXY_TIMEOUT_SECONDS", u64, 10),
    (PROVISION_TIMEOUT_SECONDS, "PROVISION_TIMEOUT_SECONDS", u64, 30),
    (TARGET_REPLICAS, "TARGET_REPLICAS", usize, 3),
);
