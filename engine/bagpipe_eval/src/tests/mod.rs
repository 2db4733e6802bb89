//! Engine test suites, one file per engine.
