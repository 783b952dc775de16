//! Prometheus counters for resolution outcomes. Registered in the default registry, so exposing
//! them is a matter of gathering `prometheus::gather()` wherever the host application serves
//! metrics.

#[cfg(feature = "prometheus")]
use lazy_static::*;
#[cfg(feature = "prometheus")]
use prometheus::{IntCounterVec, register_int_counter_vec};

#[cfg(feature = "prometheus")]
lazy_static! {
    static ref IDP_DECISIONS_TOTAL: IntCounterVec =
        register_int_counter_vec!("idp_decisions_total", "Total number of authentication decisions.", &["outcome"]).unwrap();
    static ref IDP_DENIALS_TOTAL: IntCounterVec =
        register_int_counter_vec!("idp_denials_total", "Total number of denied authentication requests.", &["reason"]).unwrap();
    static ref IDP_BACKEND_ERRORS_TOTAL: IntCounterVec =
        register_int_counter_vec!("idp_backend_errors_total", "Total number of failed store lookups.", &["backend"]).unwrap();
}

/// The store a failed lookup was sent to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Backend {
    Secret,
    Policy,
}

/// Add a metric for a granted request.
pub(crate) fn add_grant_metric() {
    #[cfg(feature = "prometheus")]
    IDP_DECISIONS_TOTAL.with_label_values(&["granted"]).inc();
}

/// Add a metric for a denied request.
#[cfg_attr(not(feature = "prometheus"), allow(unused_variables))]
pub(crate) fn add_denial_metric(reason: &str) {
    #[cfg(feature = "prometheus")]
    {
        IDP_DECISIONS_TOTAL.with_label_values(&["denied"]).inc();
        IDP_DENIALS_TOTAL.with_label_values(&[reason]).inc();
    }
}

/// Add a metric for a store lookup that failed.
#[cfg_attr(not(feature = "prometheus"), allow(unused_variables))]
pub(crate) fn add_backend_error_metric(backend: Backend) {
    #[cfg(feature = "prometheus")]
    {
        let label = match backend {
            Backend::Secret => "secret",
            Backend::Policy => "policy",
        };
        IDP_BACKEND_ERRORS_TOTAL.with_label_values(&[label]).inc();
    }
}
