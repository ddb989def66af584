//! Composition of a callable with named attachments.
//!
//! The composed wrapper owns its attachment instances; each non-literal
//! attachment holds a non-owning handle back to the wrapper core so it can
//! invoke the original callable without creating a reference cycle.

use crate::callable::{Args, CallSite, Callable};
use crate::error::{EndowError, RuntimeResult};
use crate::values::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Names of the wrapper's own surface; binding an attachment under one of
/// these is rejected instead of silently shadowing.
pub const RESERVED_ATTACHMENT_NAMES: &[&str] = &[
    "call",
    "name",
    "invoke",
    "invoke_at",
    "literal",
    "attachment_names",
];

/// An attachable operation: one entry point over the generic argument set,
/// plus the caller context captured at the wrapper boundary. Implementations
/// may call back into the delegate zero or one times.
pub trait Operation {
    fn invoke(&self, site: &CallSite, args: Args) -> RuntimeResult<Option<Value>>;
}

/// Shared base carried by every non-literal attachment: the back-reference
/// to the wrapper core and the wrapped callable's identity for reporting.
pub struct AttachmentState {
    wrapper: Weak<EndowedCore>,
    identity: String,
}

impl AttachmentState {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Invoke the original callable through the wrapper. Fails if the
    /// wrapper has been dropped while the attachment is still alive, which
    /// cannot happen under normal ownership (the wrapper owns attachments).
    pub fn delegate(&self, args: &Args) -> RuntimeResult<Value> {
        let core = self
            .wrapper
            .upgrade()
            .ok_or_else(|| EndowError::DetachedWrapper(self.identity.clone()))?;
        core.callable.call(args)
    }
}

impl fmt::Debug for AttachmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentState")
            .field("identity", &self.identity)
            .finish()
    }
}

type Constructor = Box<dyn FnOnce(AttachmentState) -> RuntimeResult<Box<dyn Operation>>>;

/// Parameter carrier pairing an attachment constructor with its explicit
/// configuration. The constructor runs at composition time, once the wrapper
/// core exists and the back-reference can be handed over.
pub struct AttachmentConfig {
    build: Constructor,
}

impl AttachmentConfig {
    pub fn new<F>(build: F) -> Self
    where
        F: FnOnce(AttachmentState) -> RuntimeResult<Box<dyn Operation>> + 'static,
    {
        Self {
            build: Box::new(build),
        }
    }
}

/// What gets bound under an attachment name: a constant value or an
/// operation built from its (default or explicit) configuration.
pub enum AttachmentSpec {
    Literal(Value),
    Operation(AttachmentConfig),
}

impl AttachmentSpec {
    pub fn literal(value: impl Into<Value>) -> Self {
        AttachmentSpec::Literal(value.into())
    }

    pub fn operation<F>(build: F) -> Self
    where
        F: FnOnce(AttachmentState) -> RuntimeResult<Box<dyn Operation>> + 'static,
    {
        AttachmentSpec::Operation(AttachmentConfig::new(build))
    }
}

impl From<Value> for AttachmentSpec {
    fn from(value: Value) -> Self {
        AttachmentSpec::Literal(value)
    }
}

enum Attachment {
    Literal(Value),
    Operation(Box<dyn Operation>),
}

struct EndowedCore {
    callable: Callable,
    attachments: RefCell<BTreeMap<String, Attachment>>,
}

/// A callable composed with named attachments. Calling it directly is
/// behaviorally identical to calling the original; named operations route
/// through their attachment entry points.
pub struct Endowed {
    core: Rc<EndowedCore>,
}

/// Compose `callable` with a set of named attachments.
///
/// Reserved and duplicate names are configuration errors and fail the whole
/// composition; so does any attachment constructor that cannot build itself
/// (an unusable cache directory, for instance).
pub fn endow<S, I>(callable: Callable, attachments: I) -> RuntimeResult<Endowed>
where
    S: Into<String>,
    I: IntoIterator<Item = (S, AttachmentSpec)>,
{
    let core = Rc::new(EndowedCore {
        callable,
        attachments: RefCell::new(BTreeMap::new()),
    });

    for (name, spec) in attachments {
        let name = name.into();
        if RESERVED_ATTACHMENT_NAMES.contains(&name.as_str()) {
            return Err(EndowError::ReservedName(name));
        }
        if core.attachments.borrow().contains_key(&name) {
            return Err(EndowError::DuplicateName(name));
        }
        let attachment = match spec {
            AttachmentSpec::Literal(value) => Attachment::Literal(value),
            AttachmentSpec::Operation(config) => {
                let state = AttachmentState {
                    wrapper: Rc::downgrade(&core),
                    identity: core.callable.name().to_string(),
                };
                Attachment::Operation((config.build)(state)?)
            }
        };
        core.attachments.borrow_mut().insert(name, attachment);
    }

    Ok(Endowed { core })
}

impl Endowed {
    /// Direct invocation: pass-through to the original callable, errors and
    /// all.
    pub fn call(&self, args: &Args) -> RuntimeResult<Value> {
        self.core.callable.call(args)
    }

    pub fn name(&self) -> &str {
        self.core.callable.name()
    }

    /// Invoke a named operation, capturing the caller's source location as
    /// the call site.
    #[track_caller]
    pub fn invoke(&self, name: &str, args: Args) -> RuntimeResult<Option<Value>> {
        self.invoke_at(CallSite::here(), name, args)
    }

    /// Invoke a named operation with an explicit call site.
    pub fn invoke_at(&self, site: CallSite, name: &str, args: Args) -> RuntimeResult<Option<Value>> {
        let bound = self.core.attachments.borrow();
        match bound.get(name) {
            Some(Attachment::Operation(op)) => op.invoke(&site, args),
            Some(Attachment::Literal(_)) => Err(EndowError::NotAnOperation(name.to_string())),
            None => Err(EndowError::UnknownAttachment(name.to_string())),
        }
    }

    /// Read a literal attachment.
    pub fn literal(&self, name: &str) -> Option<Value> {
        match self.core.attachments.borrow().get(name) {
            Some(Attachment::Literal(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn has_attachment(&self, name: &str) -> bool {
        self.core.attachments.borrow().contains_key(name)
    }

    pub fn attachment_names(&self) -> Vec<String> {
        self.core.attachments.borrow().keys().cloned().collect()
    }
}

impl fmt::Debug for Endowed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endowed")
            .field("name", &self.name())
            .field("attachments", &self.attachment_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callable::type_error;

    fn sum_callable() -> Callable {
        Callable::new("sum", |args: &Args| {
            let mut total = 0i64;
            for v in &args.positional {
                match v {
                    Value::Integer(i) => total += i,
                    other => return Err(type_error("sum", "integer", other)),
                }
            }
            Ok(Value::Integer(total))
        })
    }

    /// Doubles whatever the delegate returns; exists to prove an operation
    /// can call back through its state.
    struct DoublingOp {
        state: AttachmentState,
    }

    impl Operation for DoublingOp {
        fn invoke(&self, _site: &CallSite, args: Args) -> RuntimeResult<Option<Value>> {
            match self.state.delegate(&args)? {
                Value::Integer(i) => Ok(Some(Value::Integer(i * 2))),
                other => Ok(Some(other)),
            }
        }
    }

    #[test]
    fn test_direct_call_is_pass_through() {
        let wrapped = endow(sum_callable(), Vec::<(String, AttachmentSpec)>::new()).unwrap();
        let args = Args::positional([1i64, 2, 3]);
        assert_eq!(wrapped.call(&args).unwrap(), Value::Integer(6));
        assert_eq!(wrapped.name(), "sum");
    }

    #[test]
    fn test_literal_attachment() {
        let wrapped = endow(
            sum_callable(),
            vec![("greeting", AttachmentSpec::literal("Hello world!"))],
        )
        .unwrap();
        assert_eq!(wrapped.literal("greeting"), Some(Value::from("Hello world!")));
        assert!(wrapped.has_attachment("greeting"));

        let err = wrapped.invoke("greeting", Args::new()).unwrap_err();
        assert!(matches!(err, EndowError::NotAnOperation(_)));
    }

    #[test]
    fn test_operation_routes_and_delegates() {
        let wrapped = endow(
            sum_callable(),
            vec![(
                "double",
                AttachmentSpec::operation(|state| Ok(Box::new(DoublingOp { state }) as Box<dyn Operation>)),
            )],
        )
        .unwrap();

        let out = wrapped.invoke("double", Args::positional([2i64, 3])).unwrap();
        assert_eq!(out, Some(Value::Integer(10)));
        // direct path is unchanged by the attachment
        assert_eq!(
            wrapped.call(&Args::positional([2i64, 3])).unwrap(),
            Value::Integer(5)
        );
    }

    #[test]
    fn test_reserved_name_is_rejected() {
        let err = endow(
            sum_callable(),
            vec![("call", AttachmentSpec::literal(1i64))],
        )
        .unwrap_err();
        assert!(matches!(err, EndowError::ReservedName(name) if name == "call"));
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let err = endow(
            sum_callable(),
            vec![
                ("note", AttachmentSpec::literal(1i64)),
                ("note", AttachmentSpec::literal(2i64)),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, EndowError::DuplicateName(name) if name == "note"));
    }

    #[test]
    fn test_unknown_attachment_errors() {
        let wrapped = endow(sum_callable(), Vec::<(String, AttachmentSpec)>::new()).unwrap();
        let err = wrapped.invoke("missing", Args::new()).unwrap_err();
        assert!(matches!(err, EndowError::UnknownAttachment(_)));
    }

    #[test]
    fn test_detached_state_reports_dead_wrapper() {
        let state = AttachmentState {
            wrapper: Weak::new(),
            identity: "gone".to_string(),
        };
        let err = state.delegate(&Args::new()).unwrap_err();
        assert!(matches!(err, EndowError::DetachedWrapper(name) if name == "gone"));
    }

    #[test]
    fn test_failing_constructor_fails_composition() {
        let err = endow(
            sum_callable(),
            vec![(
                "broken",
                AttachmentSpec::operation(|_state| {
                    Err(EndowError::ConfigError("no backing directory".to_string()))
                }),
            )],
        )
        .unwrap_err();
        assert!(matches!(err, EndowError::ConfigError(_)));
    }
}
