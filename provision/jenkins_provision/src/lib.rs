// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Steps for converging a bare Windows host into a running Jenkins CI
//! server: a dedicated service account with the service-logon right, the
//! 7-Zip and Git dependencies, an unpacked Java runtime, the server package
//! and its service wrapper, the generated service configuration documents,
//! and the registered Windows service.
//!
//! Each module implements one step of the procedure; [`converge`] sequences
//! them. All host mutations go through external administration commands, so
//! this crate compiles (and its pure logic is testable) on any platform and
//! takes effect only when run on the target host.

#![forbid(unsafe_code)]

pub mod account;
pub mod artifacts;
pub mod config;
pub mod converge;
pub mod descriptor;
pub mod download;
pub mod gitconfig;
pub mod hostenv;
pub mod java_runtime;
pub mod machine_path;
pub mod package;
pub mod service;
pub mod service_logon;
