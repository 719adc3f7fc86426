//! Deferred matcher — comparisons that can be evaluated later.
//!
//! An [`Expect`] wraps a [`Subject`]: either an immediate value or a
//! producer closure. Comparing an immediate subject yields
//! [`Verdict::Ready`]. Comparing a deferred subject yields
//! [`Verdict::Deferred`], which re-reads the producer every time it is
//! evaluated, so a constraint built from it reflects live state rather than
//! the value at declaration time.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use tripwire_domain::expect::{expect, expect_with};
//!
//! assert!(expect(3).gt(2).evaluate());
//!
//! let level = Rc::new(Cell::new(1));
//! let source = Rc::clone(&level);
//! let high = expect_with(move || source.get().into()).gte(5);
//! assert!(!high.evaluate());
//! level.set(7);
//! assert!(high.evaluate());
//! ```

use std::fmt;
use std::rc::Rc;

use regex::Regex;
use serde_json::Value;

use crate::error::ValidationError;
use crate::value::{as_number, as_text, deep_equal, is_truthy, same};

/// Zero-argument closure producing the current value of a subject.
pub type Producer = Rc<dyn Fn() -> Value>;

/// What an [`Expect`] compares.
#[derive(Clone)]
pub enum Subject {
    Immediate(Value),
    Deferred(Producer),
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(v) => f.debug_tuple("Immediate").field(v).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Outcome of a comparison.
#[derive(Clone)]
pub enum Verdict {
    Ready(bool),
    Deferred(Rc<dyn Fn() -> bool>),
}

impl Verdict {
    /// Evaluate now. Deferred verdicts re-read their producer on every call.
    #[must_use]
    pub fn evaluate(&self) -> bool {
        match self {
            Self::Ready(result) => *result,
            Self::Deferred(check) => check(),
        }
    }

    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

impl From<bool> for Verdict {
    fn from(result: bool) -> Self {
        Self::Ready(result)
    }
}

impl fmt::Debug for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Matcher over an immediate value.
pub fn expect(value: impl Into<Value>) -> Expect {
    Expect {
        subject: Subject::Immediate(value.into()),
        negated: false,
    }
}

/// Matcher over a producer, evaluated lazily.
pub fn expect_with(producer: impl Fn() -> Value + 'static) -> Expect {
    Expect {
        subject: Subject::Deferred(Rc::new(producer)),
        negated: false,
    }
}

#[derive(Debug, Clone)]
pub struct Expect {
    subject: Subject,
    negated: bool,
}

impl Expect {
    /// The same matcher with every result negated.
    #[must_use]
    pub fn not(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            negated: !self.negated,
        }
    }

    #[must_use]
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    fn verdict(&self, check: impl Fn(&Value) -> bool + 'static) -> Verdict {
        let negated = self.negated;
        match &self.subject {
            Subject::Immediate(value) => Verdict::Ready(check(value) != negated),
            Subject::Deferred(producer) => {
                let producer = Rc::clone(producer);
                Verdict::Deferred(Rc::new(move || check(&producer()) != negated))
            }
        }
    }

    fn compare(&self, other: impl Into<Value>, ord: fn(f64, f64) -> bool) -> Verdict {
        let other = as_number(&other.into());
        self.verdict(move |v| match (as_number(v), other) {
            (Some(a), Some(b)) => ord(a, b),
            _ => false,
        })
    }

    /// Identity equality on scalars; alias [`is`](Self::is).
    pub fn equal(&self, expected: impl Into<Value>) -> Verdict {
        let expected = expected.into();
        self.verdict(move |v| same(v, &expected))
    }

    pub fn is(&self, expected: impl Into<Value>) -> Verdict {
        self.equal(expected)
    }

    /// Structural equality; alias [`eql`](Self::eql).
    pub fn deep_equal(&self, expected: impl Into<Value>) -> Verdict {
        let expected = expected.into();
        self.verdict(move |v| deep_equal(v, &expected))
    }

    pub fn eql(&self, expected: impl Into<Value>) -> Verdict {
        self.deep_equal(expected)
    }

    /// Anything but the absent sentinel; alias [`def`](Self::def).
    #[must_use]
    pub fn defined(&self) -> Verdict {
        self.verdict(|v| !v.is_null())
    }

    #[must_use]
    pub fn def(&self) -> Verdict {
        self.defined()
    }

    /// The absent sentinel; alias [`undef`](Self::undef).
    #[must_use]
    pub fn undefined(&self) -> Verdict {
        self.verdict(Value::is_null)
    }

    #[must_use]
    pub fn undef(&self) -> Verdict {
        self.undefined()
    }

    /// Alias [`nil`](Self::nil).
    #[must_use]
    pub fn null(&self) -> Verdict {
        self.verdict(Value::is_null)
    }

    #[must_use]
    pub fn nil(&self) -> Verdict {
        self.null()
    }

    /// Alias [`ok`](Self::ok).
    #[must_use]
    pub fn truthy(&self) -> Verdict {
        self.verdict(is_truthy)
    }

    #[must_use]
    pub fn ok(&self) -> Verdict {
        self.truthy()
    }

    /// Alias [`no`](Self::no).
    #[must_use]
    pub fn falsy(&self) -> Verdict {
        self.verdict(|v| !is_truthy(v))
    }

    #[must_use]
    pub fn no(&self) -> Verdict {
        self.falsy()
    }

    /// True when the value has no numeric reading.
    #[must_use]
    pub fn nan(&self) -> Verdict {
        self.verdict(|v| as_number(v).is_none())
    }

    /// Alias [`gt`](Self::gt).
    pub fn greater_than(&self, other: impl Into<Value>) -> Verdict {
        self.compare(other, |a, b| a > b)
    }

    pub fn gt(&self, other: impl Into<Value>) -> Verdict {
        self.greater_than(other)
    }

    /// Alias [`gte`](Self::gte).
    pub fn greater_or_equal(&self, other: impl Into<Value>) -> Verdict {
        self.compare(other, |a, b| a >= b)
    }

    pub fn gte(&self, other: impl Into<Value>) -> Verdict {
        self.greater_or_equal(other)
    }

    /// Alias [`lt`](Self::lt).
    pub fn less_than(&self, other: impl Into<Value>) -> Verdict {
        self.compare(other, |a, b| a < b)
    }

    pub fn lt(&self, other: impl Into<Value>) -> Verdict {
        self.less_than(other)
    }

    /// Alias [`lte`](Self::lte).
    pub fn less_or_equal(&self, other: impl Into<Value>) -> Verdict {
        self.compare(other, |a, b| a <= b)
    }

    pub fn lte(&self, other: impl Into<Value>) -> Verdict {
        self.less_or_equal(other)
    }

    /// Array element (structural), substring, or object key; alias
    /// [`has`](Self::has).
    pub fn contains(&self, needle: impl Into<Value>) -> Verdict {
        let needle = needle.into();
        self.verdict(move |v| match v {
            Value::Array(items) => items.iter().any(|item| deep_equal(item, &needle)),
            Value::String(s) => s.contains(&as_text(&needle)),
            Value::Object(map) => needle.as_str().is_some_and(|key| map.contains_key(key)),
            _ => false,
        })
    }

    pub fn has(&self, needle: impl Into<Value>) -> Verdict {
        self.contains(needle)
    }

    /// Regular-expression match against the value's text; alias
    /// [`like`](Self::like).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPattern`] if `pattern` does not compile.
    pub fn matches(&self, pattern: &str) -> Result<Verdict, ValidationError> {
        let re = Regex::new(pattern)?;
        Ok(self.verdict(move |v| !v.is_null() && re.is_match(&as_text(v))))
    }

    /// # Errors
    ///
    /// See [`matches`](Self::matches).
    pub fn like(&self, pattern: &str) -> Result<Verdict, ValidationError> {
        self.matches(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    #[test]
    fn should_return_ready_verdicts_for_immediate_subjects() {
        let verdict = expect("red").is("red");
        assert!(!verdict.is_deferred());
        assert!(verdict.evaluate());
        assert!(!expect("red").is("blue").evaluate());
    }

    #[test]
    fn should_reflect_new_value_each_time_deferred_verdict_is_evaluated() {
        let source = Rc::new(RefCell::new(json!("purple")));
        let reader = Rc::clone(&source);
        let verdict = expect_with(move || reader.borrow().clone()).is("purple");
        assert!(verdict.is_deferred());

        assert!(verdict.evaluate());
        *source.borrow_mut() = json!("red");
        assert!(!verdict.evaluate());
        *source.borrow_mut() = json!("purple");
        assert!(verdict.evaluate());
    }

    #[test]
    fn should_negate_results_with_not() {
        assert!(expect(3).not().gt(5).evaluate());
        assert!(!expect(3).not().not().gt(5).evaluate());
        let deferred = expect_with(|| Value::Null).not().defined();
        assert!(deferred.evaluate());
    }

    #[test]
    fn should_order_numbers_and_numeric_strings() {
        assert!(expect(5).gt(3).evaluate());
        assert!(expect(5).gte(5).evaluate());
        assert!(expect("2.5").lt(3).evaluate());
        assert!(expect(3).lte(3.0).evaluate());
        assert!(!expect("warm").gt(0).evaluate());
    }

    #[test]
    fn should_distinguish_identity_from_deep_equality() {
        assert!(!expect(json!([1, 2])).is(json!([1, 2])).evaluate());
        assert!(expect(json!([1, 2])).eql(json!([1, 2])).evaluate());
    }

    #[test]
    fn should_check_presence_and_truthiness() {
        assert!(expect(Value::Null).undefined().evaluate());
        assert!(expect(Value::Null).nil().evaluate());
        assert!(expect(0).def().evaluate());
        assert!(expect(0).no().evaluate());
        assert!(expect("on").ok().evaluate());
        assert!(expect("on").nan().evaluate());
        assert!(!expect("12").nan().evaluate());
    }

    #[test]
    fn should_check_containment() {
        assert!(expect(json!(["kitchen", "hall"])).has("hall").evaluate());
        assert!(expect("living room").contains("room").evaluate());
        assert!(expect(json!({"lux": 10})).contains("lux").evaluate());
        assert!(!expect(42).contains(4).evaluate());
    }

    #[test]
    fn should_match_patterns_and_reject_invalid_ones() {
        assert!(expect("sensor.kitchen").matches(r"^sensor\.").unwrap().evaluate());
        assert!(!expect(Value::Null).like(".*").unwrap().evaluate());
        assert!(matches!(
            expect("x").matches("("),
            Err(ValidationError::InvalidPattern(_))
        ));
    }
}
