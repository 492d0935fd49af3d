//! Core domain entities.
//!
//! The registry has a single entity, [`RedirectEntry`], plus the input types used
//! to create ([`NewRedirect`]) and partially update ([`RedirectPatch`]) it.

pub mod redirect;

pub use redirect::{
    InvalidPublishState, NewRedirect, OLD_URL_MAX_LEN, PublishState, RedirectEntry, RedirectPatch,
};
