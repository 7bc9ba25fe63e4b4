//! Cross-module tests that drive the overlay as a host would.

mod overlay_scenarios;
