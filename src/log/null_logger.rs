/*!

A "logger" used when the `logging` feature is disabled. It outputs nothing but keeps the
public API of [`crate::log`] intact.

*/

use crate::log::LogConfiguration;

impl LogConfiguration {
    /// Records the global level so `log::max_level()` still short-circuits disabled macros.
    pub(in crate::log) fn set_config(&mut self) {
        log::set_max_level(self.global_log_level);
    }
}
