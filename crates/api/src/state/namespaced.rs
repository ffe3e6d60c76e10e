// Path: crates/api/src/state/namespaced.rs

//! State access wrappers that confine a light-client module to its own namespace.

use crate::state::{StateAccess, StateScanIter};
use ioi_lc_types::error::StateError;
use ioi_lc_types::ibc::ClientId;
use ioi_lc_types::keys::{
    client_store_prefix, HOST_RESERVED_PREFIX, SUBJECT_STORE_PREFIX, SUBSTITUTE_STORE_PREFIX,
};
use std::sync::Arc;

enum Inner<'a> {
    Mutable(&'a mut dyn StateAccess),
    ReadOnly(&'a dyn StateAccess),
}

impl<'a> Inner<'a> {
    fn reader(&self) -> &dyn StateAccess {
        match self {
            Inner::Mutable(s) => &**s,
            Inner::ReadOnly(s) => *s,
        }
    }
}

/// Who is allowed to write through a [`ClientStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// A module call: everything except host-reserved keys.
    Module,
    /// A query call: nothing.
    ReadOnly,
    /// The host itself: everything, including host-reserved keys.
    Host,
}

/// A key-value handle scoped to one client's namespace, `ibc::clients::<id>/`.
///
/// Keys passed in are namespace-relative; keys returned from scans have the
/// namespace stripped. Two handles for different client identifiers never
/// observe each other's keys because client identifiers cannot contain `/`.
pub struct ClientStore<'a> {
    inner: Inner<'a>,
    prefix: Vec<u8>,
    client_id: ClientId,
    access: Access,
}

impl<'a> ClientStore<'a> {
    /// A handle for a module call that may write module-owned keys.
    pub fn new(inner: &'a mut dyn StateAccess, client_id: &ClientId) -> Self {
        Self::with_access(Inner::Mutable(inner), client_id, Access::Module)
    }

    /// A handle for a query call. Every write fails with `PermissionDenied`.
    pub fn read_only(inner: &'a dyn StateAccess, client_id: &ClientId) -> Self {
        Self::with_access(Inner::ReadOnly(inner), client_id, Access::ReadOnly)
    }

    /// A handle used by the host to maintain its reserved records.
    pub fn host(inner: &'a mut dyn StateAccess, client_id: &ClientId) -> Self {
        Self::with_access(Inner::Mutable(inner), client_id, Access::Host)
    }

    fn with_access(inner: Inner<'a>, client_id: &ClientId, access: Access) -> Self {
        Self {
            inner,
            prefix: client_store_prefix(client_id),
            client_id: client_id.clone(),
            access,
        }
    }

    /// The client whose namespace this handle covers.
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// The absolute key prefix of the namespace.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    #[inline]
    fn qualify(&self, key: &[u8]) -> Vec<u8> {
        [self.prefix.as_slice(), key].concat()
    }

    fn writable(&mut self, key: &[u8]) -> Result<&mut (dyn StateAccess + 'a), StateError> {
        let denied = match (self.access, &self.inner) {
            (Access::ReadOnly, _) | (_, Inner::ReadOnly(_)) => {
                Some("Write attempted in read-only context")
            }
            (Access::Module, _) if key.starts_with(HOST_RESERVED_PREFIX) => {
                Some("Write to host-reserved key")
            }
            _ => None,
        };
        match (denied, &mut self.inner) {
            (None, Inner::Mutable(s)) => Ok(&mut **s),
            (reason, _) => Err(StateError::PermissionDenied(format!(
                "{} '{}' in client {}",
                reason.unwrap_or("Write attempted in read-only context"),
                String::from_utf8_lossy(key),
                self.client_id
            ))),
        }
    }
}

impl<'a> StateAccess for ClientStore<'a> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        self.inner.reader().get(&self.qualify(key))
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        let qualified = self.qualify(key);
        self.writable(key)?.insert(&qualified, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        let qualified = self.qualify(key);
        self.writable(key)?.delete(&qualified)
    }

    fn batch_apply(
        &mut self,
        inserts: &[(Vec<u8>, Vec<u8>)],
        deletes: &[Vec<u8>],
    ) -> Result<(), StateError> {
        let mapped_inserts: Vec<(Vec<u8>, Vec<u8>)> =
            inserts.iter().map(|(k, v)| (self.qualify(k), v.clone())).collect();
        let mapped_deletes: Vec<Vec<u8>> = deletes.iter().map(|k| self.qualify(k)).collect();
        // Every key is checked before anything is forwarded.
        for key in inserts.iter().map(|(k, _)| k).chain(deletes.iter()) {
            self.writable(key)?;
        }
        self.writable(&[])?
            .batch_apply(&mapped_inserts, &mapped_deletes)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        let strip = self.prefix.len();
        let iter = self.inner.reader().prefix_scan(&self.qualify(prefix))?;
        Ok(Box::new(iter.map(move |res| {
            res.map(|(k, v)| (Arc::from(k.get(strip..).unwrap_or_default()), v))
        })))
    }
}

/// The wrapped store a module sees during substitute recovery.
///
/// `subject/<k>` resolves to key `<k>` in the subject client's namespace and is
/// writable (except host-reserved keys); `substitute/<k>` resolves to key `<k>`
/// in the substitute client's namespace and is read-only. Any other key is denied.
pub struct SubstituteStore<'a> {
    inner: &'a mut dyn StateAccess,
    subject_prefix: Vec<u8>,
    substitute_prefix: Vec<u8>,
}

impl<'a> SubstituteStore<'a> {
    /// Creates the wrapped store for recovering `subject` from `substitute`.
    pub fn new(inner: &'a mut dyn StateAccess, subject: &ClientId, substitute: &ClientId) -> Self {
        Self {
            inner,
            subject_prefix: client_store_prefix(subject),
            substitute_prefix: client_store_prefix(substitute),
        }
    }

    /// Resolves a wrapped key to `(absolute key, routing prefix, writable)`.
    fn route(&self, key: &[u8]) -> Result<(Vec<u8>, &'static [u8], bool), StateError> {
        if let Some(rest) = key.strip_prefix(SUBJECT_STORE_PREFIX) {
            let writable = !rest.starts_with(HOST_RESERVED_PREFIX);
            return Ok((
                [self.subject_prefix.as_slice(), rest].concat(),
                SUBJECT_STORE_PREFIX,
                writable,
            ));
        }
        if let Some(rest) = key.strip_prefix(SUBSTITUTE_STORE_PREFIX) {
            return Ok((
                [self.substitute_prefix.as_slice(), rest].concat(),
                SUBSTITUTE_STORE_PREFIX,
                false,
            ));
        }
        Err(StateError::PermissionDenied(format!(
            "Key '{}' is outside the subject and substitute namespaces",
            String::from_utf8_lossy(key)
        )))
    }

    fn route_write(&self, key: &[u8]) -> Result<Vec<u8>, StateError> {
        match self.route(key)? {
            (absolute, _, true) => Ok(absolute),
            _ => Err(StateError::PermissionDenied(format!(
                "Write to read-only recovery key '{}'",
                String::from_utf8_lossy(key)
            ))),
        }
    }
}

impl<'a> StateAccess for SubstituteStore<'a> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        let (absolute, _, _) = self.route(key)?;
        self.inner.get(&absolute)
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        let absolute = self.route_write(key)?;
        self.inner.insert(&absolute, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        let absolute = self.route_write(key)?;
        self.inner.delete(&absolute)
    }

    fn batch_apply(
        &mut self,
        inserts: &[(Vec<u8>, Vec<u8>)],
        deletes: &[Vec<u8>],
    ) -> Result<(), StateError> {
        let mapped_inserts: Vec<(Vec<u8>, Vec<u8>)> = inserts
            .iter()
            .map(|(k, v)| self.route_write(k).map(|ak| (ak, v.clone())))
            .collect::<Result<_, _>>()?;
        let mapped_deletes: Vec<Vec<u8>> = deletes
            .iter()
            .map(|k| self.route_write(k))
            .collect::<Result<_, _>>()?;
        self.inner.batch_apply(&mapped_inserts, &mapped_deletes)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        let (absolute, routing, _) = self.route(prefix)?;
        let namespace_len = if routing == SUBJECT_STORE_PREFIX {
            self.subject_prefix.len()
        } else {
            self.substitute_prefix.len()
        };
        let iter = self.inner.prefix_scan(&absolute)?;
        Ok(Box::new(iter.map(move |res| {
            res.map(|(k, v)| {
                let relative = k.get(namespace_len..).unwrap_or_default();
                (Arc::from([routing, relative].concat()), v)
            })
        })))
    }
}
