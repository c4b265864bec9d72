//! SOAP 1.1 envelope codec.
//!
//! Requests are read in RPC style: the single child of `Body` names the
//! operation and its children are the positional arguments. Namespace
//! prefixes are ignored when matching element names.

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SERVICE_NS: &str = "urn:article-api";

/// Errors that make an envelope unreadable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Document is not a SOAP envelope")]
    NotEnvelope,

    #[error("SOAP body does not name an operation")]
    MissingOperation,

    #[error("SOAP body names more than one operation")]
    MultipleOperations,

    #[error("Argument {index} of {operation} is not a simple value")]
    NestedArgument { operation: String, index: usize },
}

/// An operation call read from a request envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcCall {
    pub operation: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Envelope,
    Body,
    Operation,
    Argument,
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

fn xml_error(err: impl std::fmt::Display) -> EnvelopeError {
    EnvelopeError::Xml(err.to_string())
}

/// Reads the operation call out of a request envelope.
pub fn parse_call(xml: &str) -> Result<RpcCall, EnvelopeError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Level> = Vec::new();
    let mut seen_envelope = false;
    let mut call: Option<RpcCall> = None;
    let mut current = String::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(element) => match stack.last().copied() {
                None => {
                    if local_name(&element) != "Envelope" {
                        return Err(EnvelopeError::NotEnvelope);
                    }
                    seen_envelope = true;
                    stack.push(Level::Envelope);
                }
                Some(Level::Envelope) => {
                    if local_name(&element) == "Body" {
                        stack.push(Level::Body);
                    } else {
                        // Header and anything else outside the body.
                        reader.read_to_end(element.name()).map_err(xml_error)?;
                    }
                }
                Some(Level::Body) => {
                    if call.is_some() {
                        return Err(EnvelopeError::MultipleOperations);
                    }
                    call = Some(RpcCall {
                        operation: local_name(&element),
                        args: Vec::new(),
                    });
                    stack.push(Level::Operation);
                }
                Some(Level::Operation) => {
                    current.clear();
                    stack.push(Level::Argument);
                }
                Some(Level::Argument) => return Err(nested(call.as_ref())),
            },
            Event::Empty(element) => match stack.last().copied() {
                None => return Err(EnvelopeError::NotEnvelope),
                Some(Level::Envelope) => {}
                Some(Level::Body) => {
                    if call.is_some() {
                        return Err(EnvelopeError::MultipleOperations);
                    }
                    call = Some(RpcCall {
                        operation: local_name(&element),
                        args: Vec::new(),
                    });
                }
                Some(Level::Operation) => {
                    if let Some(call) = call.as_mut() {
                        call.args.push(String::new());
                    }
                }
                Some(Level::Argument) => return Err(nested(call.as_ref())),
            },
            Event::Text(text) => {
                if stack.last() == Some(&Level::Argument) {
                    current.push_str(&text.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(data) => {
                if stack.last() == Some(&Level::Argument) {
                    let data = std::str::from_utf8(&data).map_err(xml_error)?;
                    current.push_str(data);
                }
            }
            Event::End(_) => {
                if stack.pop() == Some(Level::Argument) {
                    if let Some(call) = call.as_mut() {
                        call.args.push(std::mem::take(&mut current));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_envelope {
        return Err(EnvelopeError::NotEnvelope);
    }
    call.ok_or(EnvelopeError::MissingOperation)
}

fn nested(call: Option<&RpcCall>) -> EnvelopeError {
    match call {
        Some(call) => EnvelopeError::NestedArgument {
            operation: call.operation.clone(),
            index: call.args.len(),
        },
        None => EnvelopeError::MissingOperation,
    }
}

fn wrap(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <SOAP-ENV:Envelope xmlns:SOAP-ENV=\"{SOAP_ENV_NS}\" xmlns:ns1=\"{SERVICE_NS}\">\
         <SOAP-ENV:Body>{body}</SOAP-ENV:Body></SOAP-ENV:Envelope>"
    )
}

/// Renders a successful call: the JSON result inside `<return>`.
pub fn render_response(operation: &str, json: &str) -> String {
    let operation = escape(operation);
    wrap(&format!(
        "<ns1:{operation}Response><return>{}</return></ns1:{operation}Response>",
        escape(json)
    ))
}

/// Fault code for calls the server cannot dispatch as sent.
pub const CLIENT_FAULT: &str = "SOAP-ENV:Client";

/// Renders a SOAP fault blaming the caller.
pub fn render_fault(message: &str) -> String {
    wrap(&format!(
        "<SOAP-ENV:Fault><faultcode>{CLIENT_FAULT}</faultcode><faultstring>{}</faultstring></SOAP-ENV:Fault>",
        escape(message)
    ))
}
