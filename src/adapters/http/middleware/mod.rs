//! HTTP middleware.

mod access;

pub use access::{
    access_middleware, account_id, admitted_probe, client_addr, AdmittedContext,
};
