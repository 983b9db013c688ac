// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Test macros for log-relay tests
//!
//! Privilege-drop behaviour can only be exercised for real when the test
//! process runs as root. This crate provides an attribute that turns such
//! tests into a no-op (with a note on stderr) for unprivileged runs.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemFn};

/// Skip this test unless running as root
///
/// # Example
///
/// ```ignore
/// use log_relay_test_macros::requires_root;
///
/// #[test]
/// #[requires_root]
/// fn collector_switches_to_nobody() {
///     // only reached when euid == 0
/// }
/// ```
///
/// The macro transforms the body into:
/// ```ignore
/// fn collector_switches_to_nobody() {
///     if !nix::unistd::geteuid().is_root() {
///         eprintln!("skipping collector_switches_to_nobody: requires root");
///         return;
///     }
///     // test body
/// }
/// ```
///
/// Only functions returning `()` are supported.
#[proc_macro_attribute]
pub fn requires_root(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    if !matches!(input.sig.output, syn::ReturnType::Default) {
        return syn::Error::new_spanned(
            &input.sig.output,
            "#[requires_root] only supports tests returning ()",
        )
        .to_compile_error()
        .into();
    }

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;
    let name = sig.ident.to_string();

    let output = quote! {
        #(#attrs)*
        #vis #sig {
            if !nix::unistd::geteuid().is_root() {
                eprintln!("skipping {}: requires root", #name);
                return;
            }

            #block
        }
    };

    output.into()
}
