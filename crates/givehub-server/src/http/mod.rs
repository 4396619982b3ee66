// SPDX-License-Identifier: Apache-2.0

pub(crate) mod auth;
pub(crate) mod certificates;
pub(crate) mod commissions;
pub(crate) mod dashboards;
pub(crate) mod donations;
pub(crate) mod health;
pub(crate) mod request_tracing;
pub(crate) mod response;
pub(crate) mod surveys;
pub(crate) mod targets;
pub(crate) mod users;
pub(crate) mod webhook;
