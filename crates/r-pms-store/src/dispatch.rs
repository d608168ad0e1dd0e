//! ---
//! pms_section: "03-variable-store"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Validation and application of remote alarm method calls."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use std::sync::Arc;

use r_pms_model::{fields, methods, Value, ValueKind};
use tracing::info;

use crate::store::VariableStore;
use crate::StoreError;

/// Sound level range accepted when activating the leveled alarm, in dB.
pub const SOUND_LEVEL_MIN_DB: f64 = 50.0;
pub const SOUND_LEVEL_MAX_DB: f64 = 120.0;

/// Errors raised while validating or applying a method invocation.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown method '{0}'")]
    UnknownMethod(String),
    #[error("method '{method}' expects {expected} arguments, got {actual}")]
    ArgumentCount {
        method: String,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validates and applies alarm method invocations against the store.
///
/// Methods are stateless; every side effect is a store write on the target
/// module's fields. Argument kinds are checked before any range check, and a
/// failed validation commits nothing.
#[derive(Debug, Clone)]
pub struct MethodDispatcher {
    store: Arc<VariableStore>,
}

impl MethodDispatcher {
    pub fn new(store: Arc<VariableStore>) -> Self {
        Self { store }
    }

    pub fn dispatch(
        &self,
        module_key: &str,
        method: &str,
        args: &[Value],
    ) -> Result<(), DispatchError> {
        match method {
            methods::SET_ALARM => self.set_alarm(module_key, args),
            methods::SET_ALARM_WITH_LEVEL => self.set_alarm_with_level(module_key, args),
            other => Err(DispatchError::UnknownMethod(other.to_owned())),
        }
    }

    /// `SetAlarm(active: bool)`.
    fn set_alarm(&self, module_key: &str, args: &[Value]) -> Result<(), DispatchError> {
        let active = expect_bool(methods::SET_ALARM, "active", args, 0, 1)?;
        self.store
            .write(module_key, fields::ALARM_ACTIVE, Value::Boolean(active))?;
        info!(module = module_key, active, "alarm switched");
        Ok(())
    }

    /// `SetAlarmWithLevel(active: bool, sound_level: f64)`.
    ///
    /// The level must be inside [50,120] dB when activating; a range failure
    /// leaves both the alarm flag and the sound level untouched. Deactivating
    /// resets the sound level to zero regardless of the supplied value.
    fn set_alarm_with_level(&self, module_key: &str, args: &[Value]) -> Result<(), DispatchError> {
        let active = expect_bool(methods::SET_ALARM_WITH_LEVEL, "active", args, 0, 2)?;
        let sound_level = expect_double(methods::SET_ALARM_WITH_LEVEL, "sound_level", args, 1, 2)?;

        if active && !(SOUND_LEVEL_MIN_DB..=SOUND_LEVEL_MAX_DB).contains(&sound_level) {
            return Err(StoreError::ConstraintViolation {
                module: module_key.to_owned(),
                field: fields::SOUND_LEVEL.to_owned(),
                value: format!("{sound_level} dB"),
            }
            .into());
        }

        // Two sequential atomic writes; concurrent readers may observe the
        // flag before the level.
        self.store
            .write(module_key, fields::ALARM_ACTIVE, Value::Boolean(active))?;
        let committed_level = if active { sound_level } else { 0.0 };
        self.store
            .write(module_key, fields::SOUND_LEVEL, Value::Double(committed_level))?;
        info!(
            module = module_key,
            active,
            sound_level_db = committed_level,
            "leveled alarm switched"
        );
        Ok(())
    }
}

fn expect_arity(
    method: &str,
    args: &[Value],
    expected: usize,
) -> Result<(), DispatchError> {
    if args.len() != expected {
        return Err(DispatchError::ArgumentCount {
            method: method.to_owned(),
            expected,
            actual: args.len(),
        });
    }
    Ok(())
}

fn expect_bool(
    method: &str,
    param: &str,
    args: &[Value],
    index: usize,
    arity: usize,
) -> Result<bool, DispatchError> {
    expect_arity(method, args, arity)?;
    args[index].as_bool().ok_or_else(|| {
        StoreError::TypeMismatch {
            context: format!("{method}.{param}"),
            expected: ValueKind::Boolean.to_string(),
            actual: args[index].kind().to_string(),
        }
        .into()
    })
}

fn expect_double(
    method: &str,
    param: &str,
    args: &[Value],
    index: usize,
    arity: usize,
) -> Result<f64, DispatchError> {
    expect_arity(method, args, arity)?;
    args[index].as_f64().ok_or_else(|| {
        StoreError::TypeMismatch {
            context: format!("{method}.{param}"),
            expected: ValueKind::Double.to_string(),
            actual: args[index].kind().to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use r_pms_model::Constraint;

    const MODULE: &str = "advanced_module_001";

    fn dispatcher() -> (Arc<VariableStore>, MethodDispatcher) {
        let store = Arc::new(VariableStore::new());
        store
            .register(MODULE, fields::ALARM_ACTIVE, Value::Boolean(false), Constraint::None)
            .expect("alarm field");
        store
            .register(MODULE, fields::SOUND_LEVEL, Value::Double(0.0), Constraint::None)
            .expect("sound field");
        (store.clone(), MethodDispatcher::new(store))
    }

    #[test]
    fn set_alarm_flips_the_flag() {
        let (store, dispatcher) = dispatcher();
        dispatcher
            .dispatch(MODULE, methods::SET_ALARM, &[Value::Boolean(true)])
            .expect("activate");
        assert_eq!(
            store.read(MODULE, fields::ALARM_ACTIVE).expect("read"),
            Value::Boolean(true)
        );
    }

    #[test]
    fn leveled_alarm_below_range_changes_nothing() {
        let (store, dispatcher) = dispatcher();
        let err = dispatcher
            .dispatch(
                MODULE,
                methods::SET_ALARM_WITH_LEVEL,
                &[Value::Boolean(true), Value::Double(30.0)],
            )
            .expect_err("range violation");
        assert!(matches!(
            err,
            DispatchError::Store(StoreError::ConstraintViolation { .. })
        ));
        assert_eq!(
            store.read(MODULE, fields::ALARM_ACTIVE).expect("read"),
            Value::Boolean(false)
        );
        assert_eq!(
            store.read(MODULE, fields::SOUND_LEVEL).expect("read"),
            Value::Double(0.0)
        );
    }

    #[test]
    fn leveled_alarm_activates_at_valid_level() {
        let (store, dispatcher) = dispatcher();
        dispatcher
            .dispatch(
                MODULE,
                methods::SET_ALARM_WITH_LEVEL,
                &[Value::Boolean(true), Value::Double(75.0)],
            )
            .expect("activate");
        assert_eq!(
            store.read(MODULE, fields::SOUND_LEVEL).expect("read"),
            Value::Double(75.0)
        );
    }

    #[test]
    fn deactivation_resets_sound_level() {
        let (store, dispatcher) = dispatcher();
        dispatcher
            .dispatch(
                MODULE,
                methods::SET_ALARM_WITH_LEVEL,
                &[Value::Boolean(true), Value::Double(90.0)],
            )
            .expect("activate");
        dispatcher
            .dispatch(
                MODULE,
                methods::SET_ALARM_WITH_LEVEL,
                &[Value::Boolean(false), Value::Double(75.0)],
            )
            .expect("deactivate");
        assert_eq!(
            store.read(MODULE, fields::ALARM_ACTIVE).expect("read"),
            Value::Boolean(false)
        );
        assert_eq!(
            store.read(MODULE, fields::SOUND_LEVEL).expect("read"),
            Value::Double(0.0)
        );
    }

    #[test]
    fn kind_errors_short_circuit_range_checks() {
        let (store, dispatcher) = dispatcher();
        // 30.0 would also fail the range check, but the kind error on the
        // first argument must win.
        let err = dispatcher
            .dispatch(
                MODULE,
                methods::SET_ALARM_WITH_LEVEL,
                &[Value::Int32(1), Value::Double(30.0)],
            )
            .expect_err("kind mismatch");
        assert!(matches!(
            err,
            DispatchError::Store(StoreError::TypeMismatch { .. })
        ));
        assert_eq!(
            store.read(MODULE, fields::ALARM_ACTIVE).expect("read"),
            Value::Boolean(false)
        );
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let (_, dispatcher) = dispatcher();
        assert!(matches!(
            dispatcher.dispatch(MODULE, methods::SET_ALARM, &[]),
            Err(DispatchError::ArgumentCount { .. })
        ));
    }

    #[test]
    fn unknown_method_is_rejected() {
        let (_, dispatcher) = dispatcher();
        assert!(matches!(
            dispatcher.dispatch(MODULE, "SelfDestruct", &[]),
            Err(DispatchError::UnknownMethod(_))
        ));
    }
}
