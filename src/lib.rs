//! Core domain library for the e-visa demo portal.
//!
//! The crate owns the three pieces of the portal with real logic: the
//! nationality/destination/visa-type binding catalog that decides who may
//! apply for what and at which price, the template engine that renders and
//! validates admin-authored application forms, and the application workflow
//! that tracks applicants, fees, and the payment lifecycle. Persistence is
//! consumed through the [`storage::KeyValueStore`] contract; page rendering,
//! authentication, and the simulated payment gateway live outside this crate.

pub mod applications;
pub mod catalog;
pub mod config;
pub mod storage;
pub mod telemetry;
pub mod templates;
