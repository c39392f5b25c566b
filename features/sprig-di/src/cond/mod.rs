//! Predicates deciding which beans survive a refresh

use std::sync::Arc;

use sprig_config::Properties;

use crate::{bean::BeanDefinition, errors::Error, tag::Selector};

mod expr;

/// Read-only view of the container handed to conditions
pub trait ConditionContext {
    fn properties(&self) -> &Properties;

    /// Active profiles, lower-cased
    fn profiles(&self) -> Vec<String>;

    /// Surviving beans matching `selector`, without wiring them
    fn find(&self, selector: &Selector) -> Result<Vec<&BeanDefinition>, Error>;
}

/// Decides whether a bean or option takes part in the container
pub trait Condition: Send + Sync + 'static {
    fn matches(&self, ctx: &dyn ConditionContext) -> Result<bool, Error>;
}

/// Holds depending on presence and value of a property
#[derive(Debug, Clone)]
pub struct OnProperty {
    key: String,
    having_value: Option<String>,
    match_if_missing: bool,
}

impl OnProperty {
    /// Expected value; prefix with `expr:` to test `$` with an expression
    pub fn having_value(mut self, value: impl Into<String>) -> Self {
        self.having_value = Some(value.into());
        self
    }

    pub fn match_if_missing(mut self) -> Self {
        self.match_if_missing = true;
        self
    }
}

impl Condition for OnProperty {
    fn matches(&self, ctx: &dyn ConditionContext) -> Result<bool, Error> {
        let properties = ctx.properties();
        if !properties.has(&self.key) {
            return Ok(self.match_if_missing);
        }
        let Some(expected) = &self.having_value else {
            return Ok(true);
        };

        let value = properties.resolve(properties.get(&self.key).unwrap_or_default())?;
        match expected.strip_prefix("expr:") {
            Some(expression) => expr::evaluate(expression, &value),
            None => Ok(value == *expected),
        }
    }
}

pub fn on_property(key: impl Into<String>) -> OnProperty {
    OnProperty {
        key: key.into(),
        having_value: None,
        match_if_missing: false,
    }
}

pub fn on_property_value(key: impl Into<String>, value: impl Into<String>) -> OnProperty {
    on_property(key).having_value(value)
}

pub struct OnMissingProperty(String);

impl Condition for OnMissingProperty {
    fn matches(&self, ctx: &dyn ConditionContext) -> Result<bool, Error> {
        Ok(!ctx.properties().has(&self.0))
    }
}

pub fn on_missing_property(key: impl Into<String>) -> OnMissingProperty {
    OnMissingProperty(key.into())
}

/// Holds if the number of matching beans passes a check
pub struct OnBean {
    selector: Selector,
    check: fn(&[&BeanDefinition]) -> bool,
}

impl Condition for OnBean {
    fn matches(&self, ctx: &dyn ConditionContext) -> Result<bool, Error> {
        let beans = ctx.find(&self.selector)?;
        Ok((self.check)(&beans))
    }
}

pub fn on_bean(selector: impl Into<Selector>) -> OnBean {
    OnBean {
        selector: selector.into(),
        check: |beans| !beans.is_empty(),
    }
}

pub fn on_missing_bean(selector: impl Into<Selector>) -> OnBean {
    OnBean {
        selector: selector.into(),
        check: |beans| beans.is_empty(),
    }
}

/// Exactly one match, or exactly one primary among several
pub fn on_single_bean(selector: impl Into<Selector>) -> OnBean {
    OnBean {
        selector: selector.into(),
        check: |beans| beans.len() == 1 || beans.iter().filter(|b| b.primary()).count() == 1,
    }
}

pub struct OnProfile(String);

impl Condition for OnProfile {
    fn matches(&self, ctx: &dyn ConditionContext) -> Result<bool, Error> {
        let wanted = self.0.to_lowercase();
        Ok(ctx.profiles().iter().any(|profile| *profile == wanted))
    }
}

/// Holds if `profile` is active; comparison ignores case
pub fn on_profile(profile: impl Into<String>) -> OnProfile {
    OnProfile(profile.into())
}

pub struct OnMatches<F>(F);

impl<F> Condition for OnMatches<F>
where
    F: Fn(&dyn ConditionContext) -> Result<bool, Error> + Send + Sync + 'static,
{
    fn matches(&self, ctx: &dyn ConditionContext) -> Result<bool, Error> {
        (self.0)(ctx)
    }
}

pub fn on_matches<F>(f: F) -> OnMatches<F>
where
    F: Fn(&dyn ConditionContext) -> Result<bool, Error> + Send + Sync + 'static,
{
    OnMatches(f)
}

pub struct And(Vec<Arc<dyn Condition>>);

impl Condition for And {
    fn matches(&self, ctx: &dyn ConditionContext) -> Result<bool, Error> {
        for condition in &self.0 {
            if !condition.matches(ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

pub struct Or(Vec<Arc<dyn Condition>>);

impl Condition for Or {
    fn matches(&self, ctx: &dyn ConditionContext) -> Result<bool, Error> {
        for condition in &self.0 {
            if condition.matches(ctx)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

pub struct Not(Arc<dyn Condition>);

impl Condition for Not {
    fn matches(&self, ctx: &dyn ConditionContext) -> Result<bool, Error> {
        Ok(!self.0.matches(ctx)?)
    }
}

/// Short-circuits on the first false
pub fn and(a: impl Condition, b: impl Condition) -> And {
    And(vec![Arc::new(a), Arc::new(b)])
}

/// Short-circuits on the first true
pub fn or(a: impl Condition, b: impl Condition) -> Or {
    Or(vec![Arc::new(a), Arc::new(b)])
}

pub fn not(condition: impl Condition) -> Not {
    Not(Arc::new(condition))
}

/// Holds if neither holds
pub fn none(a: impl Condition, b: impl Condition) -> Not {
    not(or(a, b))
}
