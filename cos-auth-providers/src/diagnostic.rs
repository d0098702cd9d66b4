/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use cos_types::credential::provide_credentials::{future, ProvideCredentials};
use cos_types::credential::CredentialsError;
use std::borrow::Cow;

/// Always fails with the same error
///
/// Placed in a chain when no credentials source was found, so that the eventual failure names
/// the sources that were tried.
#[derive(Clone, Debug)]
pub struct DiagnosticProvider {
    code: Cow<'static, str>,
    message: Cow<'static, str>,
}

impl DiagnosticProvider {
    pub fn new(code: impl Into<Cow<'static, str>>, message: impl Into<Cow<'static, str>>) -> Self {
        DiagnosticProvider {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl ProvideCredentials for DiagnosticProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::ready(Err(CredentialsError::not_loaded(
            self.code.clone(),
            self.message.clone(),
        )))
    }

    fn is_expired(&self) -> bool {
        true
    }
}
