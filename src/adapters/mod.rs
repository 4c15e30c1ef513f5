//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements          | Connects to                 |
//! |-----------------|---------------------|-----------------------------|
//! | `config_file`   | ConfigPort          | JSON config file            |
//! | `log_sink`      | EventSink           | `log` facade                |
//! | `profile_store` | ProfileStore        | `<dir>/<name>.json`         |
//! | `restart_store` | SnapshotStore       | atomic JSON snapshot file   |
//! | `simulated`     | Actuator            | thermal plant + tracker     |
//! | `time`          | Clock               | `Instant` / virtual time    |

pub mod config_file;
pub mod log_sink;
pub mod profile_store;
pub mod restart_store;
pub mod simulated;
pub mod time;
