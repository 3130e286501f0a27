//! Built-in filters.
//!
//! Request-phase filters change the exchange before calling `proceed`;
//! response-phase filters change the response after it returns. Arguments are
//! checked when the filter is built, so only template expansion can fail at
//! request time.

use async_trait::async_trait;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use regex::Regex;

use crate::config::ArgumentError;
use crate::filter::chain::{Chain, GatewayFilter};
use crate::http::{empty_response, DispatchError, Exchange};
use crate::routing::pattern::{check_template, expand_template};

fn header_name(arg: &str) -> Result<HeaderName, ArgumentError> {
    HeaderName::try_from(arg).map_err(|_| ArgumentError::new(format!("invalid header name '{}'", arg)))
}

fn header_value(arg: &str) -> Result<HeaderValue, ArgumentError> {
    HeaderValue::try_from(arg)
        .map_err(|_| ArgumentError::new(format!("invalid header value '{}'", arg)))
}

fn name_and_value(args: &[String]) -> Result<(HeaderName, HeaderValue), ArgumentError> {
    ArgumentError::check_arity(args, 2, 2)?;
    Ok((header_name(&args[0])?, header_value(&args[1])?))
}

/// Appends a request header, keeping existing values.
#[derive(Debug, Clone)]
pub struct AddRequestHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl AddRequestHeader {
    pub fn from_args(args: &[String]) -> Result<Self, ArgumentError> {
        let (name, value) = name_and_value(args)?;
        Ok(Self { name, value })
    }
}

#[async_trait]
impl GatewayFilter for AddRequestHeader {
    fn name(&self) -> &str {
        "AddRequestHeader"
    }

    async fn filter(&self, exchange: &mut Exchange, chain: Chain<'_>) -> Result<(), DispatchError> {
        exchange
            .headers_mut()
            .append(self.name.clone(), self.value.clone());
        chain.proceed(exchange).await
    }
}

/// Appends a response header, keeping existing values.
#[derive(Debug, Clone)]
pub struct AddResponseHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl AddResponseHeader {
    pub fn from_args(args: &[String]) -> Result<Self, ArgumentError> {
        let (name, value) = name_and_value(args)?;
        Ok(Self { name, value })
    }
}

#[async_trait]
impl GatewayFilter for AddResponseHeader {
    fn name(&self) -> &str {
        "AddResponseHeader"
    }

    async fn filter(&self, exchange: &mut Exchange, chain: Chain<'_>) -> Result<(), DispatchError> {
        chain.proceed(exchange).await?;
        if let Some(response) = exchange.response_mut() {
            response
                .headers_mut()
                .append(self.name.clone(), self.value.clone());
        }
        Ok(())
    }
}

/// Replaces every value of a response header with one value.
#[derive(Debug, Clone)]
pub struct SetResponseHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl SetResponseHeader {
    pub fn from_args(args: &[String]) -> Result<Self, ArgumentError> {
        let (name, value) = name_and_value(args)?;
        Ok(Self { name, value })
    }
}

#[async_trait]
impl GatewayFilter for SetResponseHeader {
    fn name(&self) -> &str {
        "SetResponseHeader"
    }

    async fn filter(&self, exchange: &mut Exchange, chain: Chain<'_>) -> Result<(), DispatchError> {
        chain.proceed(exchange).await?;
        if let Some(response) = exchange.response_mut() {
            response
                .headers_mut()
                .insert(self.name.clone(), self.value.clone());
        }
        Ok(())
    }
}

/// Removes all values of a request header.
#[derive(Debug, Clone)]
pub struct RemoveRequestHeader {
    name: HeaderName,
}

impl RemoveRequestHeader {
    pub fn from_args(args: &[String]) -> Result<Self, ArgumentError> {
        ArgumentError::check_arity(args, 1, 1)?;
        Ok(Self {
            name: header_name(&args[0])?,
        })
    }
}

#[async_trait]
impl GatewayFilter for RemoveRequestHeader {
    fn name(&self) -> &str {
        "RemoveRequestHeader"
    }

    async fn filter(&self, exchange: &mut Exchange, chain: Chain<'_>) -> Result<(), DispatchError> {
        exchange.headers_mut().remove(&self.name);
        chain.proceed(exchange).await
    }
}

/// Removes all values of a response header.
#[derive(Debug, Clone)]
pub struct RemoveResponseHeader {
    name: HeaderName,
}

impl RemoveResponseHeader {
    pub fn from_args(args: &[String]) -> Result<Self, ArgumentError> {
        ArgumentError::check_arity(args, 1, 1)?;
        Ok(Self {
            name: header_name(&args[0])?,
        })
    }
}

#[async_trait]
impl GatewayFilter for RemoveResponseHeader {
    fn name(&self) -> &str {
        "RemoveResponseHeader"
    }

    async fn filter(&self, exchange: &mut Exchange, chain: Chain<'_>) -> Result<(), DispatchError> {
        chain.proceed(exchange).await?;
        if let Some(response) = exchange.response_mut() {
            response.headers_mut().remove(&self.name);
        }
        Ok(())
    }
}

/// Replaces the request path with a template over captured variables.
#[derive(Debug, Clone)]
pub struct SetPath {
    template: String,
}

impl SetPath {
    pub fn from_args(args: &[String]) -> Result<Self, ArgumentError> {
        ArgumentError::check_arity(args, 1, 1)?;
        let template = &args[0];
        if !template.starts_with('/') {
            return Err(ArgumentError::new(format!(
                "path template '{}' must start with '/'",
                template
            )));
        }
        check_template(template)?;
        Ok(Self {
            template: template.clone(),
        })
    }
}

#[async_trait]
impl GatewayFilter for SetPath {
    fn name(&self) -> &str {
        "SetPath"
    }

    async fn filter(&self, exchange: &mut Exchange, chain: Chain<'_>) -> Result<(), DispatchError> {
        let path = expand_template(&self.template, exchange.attributes().uri_variables())
            .map_err(|reason| DispatchError::filter(self.name(), reason))?;
        exchange
            .set_path(&path)
            .map_err(|reason| DispatchError::filter(self.name(), reason))?;
        chain.proceed(exchange).await
    }
}

/// Regex substitution on the request path.
///
/// The replacement refers to named groups as `${name}`; the escaped form
/// `$\{name}` is accepted too.
#[derive(Debug, Clone)]
pub struct RewritePath {
    regex: Regex,
    replacement: String,
}

impl RewritePath {
    pub fn from_args(args: &[String]) -> Result<Self, ArgumentError> {
        ArgumentError::check_arity(args, 2, 2)?;
        Ok(Self {
            regex: Regex::new(&args[0])?,
            replacement: args[1].replace("$\\{", "${"),
        })
    }
}

#[async_trait]
impl GatewayFilter for RewritePath {
    fn name(&self) -> &str {
        "RewritePath"
    }

    async fn filter(&self, exchange: &mut Exchange, chain: Chain<'_>) -> Result<(), DispatchError> {
        let rewritten = self
            .regex
            .replace_all(exchange.path(), self.replacement.as_str())
            .into_owned();
        let path = if rewritten.starts_with('/') {
            rewritten
        } else {
            format!("/{}", rewritten)
        };
        exchange
            .set_path(&path)
            .map_err(|reason| DispatchError::filter(self.name(), reason))?;
        chain.proceed(exchange).await
    }
}

/// Overwrites the response status after the backend replies.
#[derive(Debug, Clone)]
pub struct SetStatus {
    status: StatusCode,
}

impl SetStatus {
    pub fn from_args(args: &[String]) -> Result<Self, ArgumentError> {
        ArgumentError::check_arity(args, 1, 1)?;
        Ok(Self {
            status: parse_status(&args[0])?,
        })
    }
}

#[async_trait]
impl GatewayFilter for SetStatus {
    fn name(&self) -> &str {
        "SetStatus"
    }

    async fn filter(&self, exchange: &mut Exchange, chain: Chain<'_>) -> Result<(), DispatchError> {
        chain.proceed(exchange).await?;
        if let Some(response) = exchange.response_mut() {
            *response.status_mut() = self.status;
        }
        Ok(())
    }
}

/// Answers with a redirect instead of forwarding.
#[derive(Debug, Clone)]
pub struct RedirectTo {
    status: StatusCode,
    location: HeaderValue,
}

impl RedirectTo {
    pub fn from_args(args: &[String]) -> Result<Self, ArgumentError> {
        ArgumentError::check_arity(args, 2, 2)?;
        let status = parse_status(&args[0])?;
        if !status.is_redirection() {
            return Err(ArgumentError::new(format!(
                "status {} is not a redirect",
                status.as_u16()
            )));
        }
        Ok(Self {
            status,
            location: header_value(&args[1])?,
        })
    }
}

#[async_trait]
impl GatewayFilter for RedirectTo {
    fn name(&self) -> &str {
        "RedirectTo"
    }

    async fn filter(&self, exchange: &mut Exchange, _chain: Chain<'_>) -> Result<(), DispatchError> {
        let mut response = empty_response();
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(header::LOCATION, self.location.clone());
        exchange.set_response(response);
        Ok(())
    }
}

/// Parse `404` or `NOT_FOUND`.
fn parse_status(arg: &str) -> Result<StatusCode, ArgumentError> {
    if let Ok(code) = arg.parse::<u16>() {
        return StatusCode::from_u16(code)
            .map_err(|_| ArgumentError::new(format!("invalid status code {}", code)));
    }
    (100..=599)
        .filter_map(|code| StatusCode::from_u16(code).ok())
        .find(|status| {
            status
                .canonical_reason()
                .map(|reason| reason_constant(reason) == arg)
                .unwrap_or(false)
        })
        .ok_or_else(|| ArgumentError::new(format!("unknown status '{}'", arg)))
}

/// `"Not Found"` becomes `"NOT_FOUND"`.
fn reason_constant(reason: &str) -> String {
    reason
        .chars()
        .filter(|c| *c != '\'')
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
