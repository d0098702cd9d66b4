/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Named request handlers run at each phase of an operation
//!
//! A [`Session`](crate::Session) owns one [`Handlers`] value; copies of the session and the
//! client configurations it produces get their own copy, so handlers added to a client never
//! reach the session.

use bytes::Bytes;
use std::borrow::Cow;
use std::error::Error;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use thiserror::Error;

type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Name of the handler that validates operation parameters
pub const VALIDATE_PARAMETERS_HANDLER: &str = "core.ValidateParametersHandler";

/// One parameter that failed validation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidParam {
    pub field: String,
    pub message: String,
}

impl InvalidParam {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        InvalidParam {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
#[error("{} validation error(s) found.", .errors.len())]
pub struct InvalidParamsError {
    pub operation: String,
    pub errors: Vec<InvalidParam>,
}

impl InvalidParamsError {
    pub fn code(&self) -> &'static str {
        "InvalidParameter"
    }
}

/// Operation input that can check itself before a request is built
pub trait ValidateParams: Send + Sync + Debug {
    fn validate(&self) -> Result<(), Vec<InvalidParam>>;
}

/// An operation request as it moves through the handler lists
#[derive(Debug)]
pub struct OperationRequest {
    pub operation_name: Cow<'static, str>,
    pub params: Option<Box<dyn ValidateParams>>,
    pub http_request: http::Request<Bytes>,

    /// Set by the first failing handler
    pub error: Option<BoxError>,
}

impl OperationRequest {
    pub fn new(operation_name: impl Into<Cow<'static, str>>, http_request: http::Request<Bytes>) -> Self {
        OperationRequest {
            operation_name: operation_name.into(),
            params: None,
            http_request,
            error: None,
        }
    }

    pub fn with_params(mut self, params: impl ValidateParams + 'static) -> Self {
        self.params = Some(Box::new(params));
        self
    }
}

type HandlerFn = dyn Fn(&mut OperationRequest) + Send + Sync;

/// A handler with a name, so that it can be found and removed later
#[derive(Clone)]
pub struct NamedHandler {
    name: Cow<'static, str>,
    handler: Arc<HandlerFn>,
}

impl NamedHandler {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        handler: impl Fn(&mut OperationRequest) + Send + Sync + 'static,
    ) -> Self {
        NamedHandler {
            name: name.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Debug for NamedHandler {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamedHandler").field(&self.name).finish()
    }
}

/// Ordered list of handlers
///
/// [`run`](HandlerList::run) stops at the first handler that sets
/// [`OperationRequest::error`].
#[derive(Clone, Debug, Default)]
pub struct HandlerList {
    handlers: Vec<NamedHandler>,
}

impl HandlerList {
    pub fn push_back(&mut self, handler: NamedHandler) {
        self.handlers.push(handler);
    }

    pub fn push_front(&mut self, handler: NamedHandler) {
        self.handlers.insert(0, handler);
    }

    /// Removes every handler called `name`
    pub fn remove(&mut self, name: &str) {
        self.handlers.retain(|handler| handler.name() != name);
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(NamedHandler::name)
    }

    pub fn run(&self, request: &mut OperationRequest) {
        for handler in &self.handlers {
            (handler.handler)(request);
            if request.error.is_some() {
                tracing::debug!(handler = %handler.name, operation = %request.operation_name, "handler failed the request");
                return;
            }
        }
    }
}

/// Handler lists for each phase of an operation
#[derive(Clone, Debug, Default)]
pub struct Handlers {
    pub validate: HandlerList,
    pub build: HandlerList,
    pub sign: HandlerList,
    pub send: HandlerList,
}

impl Handlers {
    /// The handlers every session starts with
    pub fn defaults() -> Self {
        let mut handlers = Handlers::default();
        handlers.validate.push_back(validate_parameters_handler());
        handlers
    }

    pub fn clear(&mut self) {
        self.validate.clear();
        self.build.clear();
        self.sign.clear();
        self.send.clear();
    }
}

/// Fails the request with an [`InvalidParamsError`] when its parameters do not validate
pub fn validate_parameters_handler() -> NamedHandler {
    NamedHandler::new(VALIDATE_PARAMETERS_HANDLER, |request: &mut OperationRequest| {
        let errors = match request.params.as_ref().map(|params| params.validate()) {
            Some(Err(errors)) => errors,
            _ => return,
        };
        request.error = Some(Box::new(InvalidParamsError {
            operation: request.operation_name.to_string(),
            errors,
        }));
    })
}
