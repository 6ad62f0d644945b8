//! Members and base delegation
//!
//! A declaration level contributes a [`MemberMap`]. While composing an
//! instance each member is wrapped into a [`ComposedMember`] that holds an
//! immutable link to the same-named member of the level below, if there was
//! one. Invoking the member hands its body a [`Call`], through which the
//! body reaches the instance, its protected state and its `base`.
//!
//! ```text
//! Dog::speak  --base-->  Animal::speak  --base-->  (none: NoBaseMethodToCall)
//! ```

use crate::context::ProtectedState;
use crate::instance::Instance;
use crate::value::Value;
use crate::{FactoryError, FactoryResult};
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Member body
pub type Member = Rc<dyn Fn(&Call<'_>, &[Value]) -> FactoryResult<Value>>;

/// Ordered member map produced by one declaration level
#[derive(Default, Clone)]
pub struct MemberMap {
    members: IndexMap<String, Member>,
}

impl MemberMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method (builder style)
    pub fn method<F>(mut self, name: &str, body: F) -> Self
    where
        F: Fn(&Call<'_>, &[Value]) -> FactoryResult<Value> + 'static,
    {
        self.insert(name, body);
        self
    }

    /// Add a method, replacing any previous one of the same name
    pub fn insert<F>(&mut self, name: &str, body: F)
    where
        F: Fn(&Call<'_>, &[Value]) -> FactoryResult<Value> + 'static,
    {
        self.members.insert(name.to_string(), Rc::new(body));
    }

    /// Check if a member is present
    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    /// Member names in insertion order
    pub fn names(&self) -> Vec<String> {
        self.members.keys().cloned().collect()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl IntoIterator for MemberMap {
    type Item = (String, Member);
    type IntoIter = indexmap::map::IntoIter<String, Member>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

impl fmt::Debug for MemberMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.members.keys()).finish()
    }
}

/// A member wrapped with its link to the level below
pub struct ComposedMember {
    name: String,
    level: String,
    body: Member,
    base: Option<Rc<ComposedMember>>,
}

impl ComposedMember {
    pub(crate) fn new(
        name: String,
        level: String,
        body: Member,
        base: Option<Rc<ComposedMember>>,
    ) -> Self {
        Self {
            name,
            level,
            body,
            base,
        }
    }

    /// Member name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the class level that contributed this member
    pub fn level(&self) -> &str {
        &self.level
    }

    /// Immediately preceding implementation, if any
    pub fn base(&self) -> Option<&Rc<ComposedMember>> {
        self.base.as_ref()
    }

    /// Length of the override chain ending at this member
    pub fn depth(&self) -> usize {
        1 + self.base.as_ref().map_or(0, |base| base.depth())
    }

    /// Run the member body against an instance
    pub fn invoke(&self, instance: &Instance, args: &[Value]) -> FactoryResult<Value> {
        let call = Call {
            instance,
            member: self,
            args,
        };
        (self.body)(&call, args)
    }
}

impl fmt::Debug for ComposedMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedMember")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("depth", &self.depth())
            .finish()
    }
}

/// Execution record of one member invocation
pub struct Call<'a> {
    instance: &'a Instance,
    member: &'a ComposedMember,
    args: &'a [Value],
}

impl<'a> Call<'a> {
    /// The instance the member runs on
    pub fn this(&self) -> &'a Instance {
        self.instance
    }

    /// Arguments of this call
    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    /// Protected state of the instance
    pub fn protected(&self) -> &'a ProtectedState {
        self.instance.context().protected()
    }

    /// Name of the running member
    pub fn member_name(&self) -> &'a str {
        self.member.name()
    }

    /// Class level that contributed the running body
    pub fn level(&self) -> &'a str {
        self.member.level()
    }

    /// Check if a base implementation exists
    pub fn has_base(&self) -> bool {
        self.member.base.is_some()
    }

    /// Invoke the base implementation with this call's arguments
    pub fn base(&self) -> FactoryResult<Value> {
        self.base_with(self.args)
    }

    /// Invoke the base implementation with other arguments
    pub fn base_with(&self, args: &[Value]) -> FactoryResult<Value> {
        match &self.member.base {
            Some(base) => {
                tracing::trace!(
                    member = %self.member.name,
                    from = %self.member.level,
                    to = %base.level,
                    "base delegation"
                );
                base.invoke(self.instance, args)
            }
            None => Err(FactoryError::NoBaseMethodToCall {
                member: self.member.name.clone(),
            }),
        }
    }
}
