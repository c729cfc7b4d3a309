//! To-one relationship holder.

use crate::Result;
use crate::model::{self, Model, ModelRef, RelatedValue};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// A to-one relationship field (`many_to_one` / `one_to_one`).
///
/// The field is in one of three states: empty, holding only a foreign-key
/// value (lazily fetched rows), or holding the loaded related entity.
///
/// ```ignore
/// #[derive(Model, Default)]
/// struct Hero {
///     #[kettle(id)]
///     id: Option<i64>,
///     #[kettle(many_to_one(join_column = "team_id", cascade(persist)))]
///     team: Related<Team>,
/// }
///
/// hero.team.set(model_ref(team));
/// ```
pub struct Related<T: Model> {
    state: State<T>,
}

enum State<T: Model> {
    Empty,
    Key(Value),
    Loaded(ModelRef<T>),
}

impl<T: Model> Related<T> {
    pub fn empty() -> Self {
        Self { state: State::Empty }
    }

    /// Relationship pointing at a loaded entity.
    pub fn new(target: ModelRef<T>) -> Self {
        Self {
            state: State::Loaded(target),
        }
    }

    /// Relationship known only by its foreign-key value.
    pub fn from_fk(fk: impl Into<Value>) -> Self {
        match fk.into() {
            Value::Null => Self::empty(),
            fk => Self {
                state: State::Key(fk),
            },
        }
    }

    /// The loaded related entity, if any.
    pub fn get(&self) -> Option<&ModelRef<T>> {
        match &self.state {
            State::Loaded(target) => Some(target),
            _ => None,
        }
    }

    /// The foreign-key value of an unloaded relationship.
    pub fn fk(&self) -> Option<&Value> {
        match &self.state {
            State::Key(fk) => Some(fk),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, State::Loaded(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.state, State::Empty)
    }

    pub fn set(&mut self, target: ModelRef<T>) {
        self.state = State::Loaded(target);
    }

    pub fn clear(&mut self) {
        self.state = State::Empty;
    }

    /// Type-erased form, as returned from `Model::read`.
    pub fn to_erased(&self) -> RelatedValue {
        match &self.state {
            State::Empty => RelatedValue::Empty,
            State::Key(fk) => RelatedValue::Key(fk.clone()),
            State::Loaded(target) => RelatedValue::Loaded(model::erase(target)),
        }
    }

    /// Rebuild from the type-erased form, as passed to `Model::write`.
    pub fn from_erased(value: RelatedValue) -> Result<Self> {
        Ok(match value {
            RelatedValue::Empty => Self::empty(),
            RelatedValue::Key(fk) => Self::from_fk(fk),
            RelatedValue::Loaded(target) => Self::new(model::downcast::<T>(target)?),
        })
    }
}

impl<T: Model> Default for Related<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Model> Clone for Related<T> {
    fn clone(&self) -> Self {
        let state = match &self.state {
            State::Empty => State::Empty,
            State::Key(fk) => State::Key(fk.clone()),
            State::Loaded(target) => State::Loaded(Arc::clone(target)),
        };
        Self { state }
    }
}

impl<T: Model> fmt::Debug for Related<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            State::Empty => write!(f, "Related<{}>(empty)", T::NAME),
            State::Key(fk) => write!(f, "Related<{}>(fk = {:?})", T::NAME, fk),
            State::Loaded(_) => write!(f, "Related<{}>(loaded)", T::NAME),
        }
    }
}

impl<T: Model> From<ModelRef<T>> for Related<T> {
    fn from(target: ModelRef<T>) -> Self {
        Self::new(target)
    }
}
