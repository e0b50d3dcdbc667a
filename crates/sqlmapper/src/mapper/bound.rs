//! Bound functions produced by the [`Binder`](super::Binder).
//!
//! Each handle captures a connection and a template candidate list. The
//! `Default` value of every handle is unbound and fails with
//! [`DbError::NilHandle`].

use crate::client::GenericClient;
use crate::database::Database;
use crate::driver::ExecResult;
use crate::error::{DbError, DbResult};
use crate::transaction::{Tx, TxOptions};
use crate::value::Value;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct Binding {
    db: Arc<Database>,
    candidates: Arc<[String]>,
}

impl Binding {
    pub(crate) fn new(db: Arc<Database>, candidates: Vec<String>) -> Self {
        Self {
            db,
            candidates: candidates.into(),
        }
    }

    /// First registered candidate, looked up at call time.
    fn template(&self) -> DbResult<String> {
        self.db
            .templates()
            .resolve(&self.candidates)
            .map(str::to_string)
    }
}

fn bound(binding: &Option<Binding>) -> DbResult<&Binding> {
    binding.as_ref().ok_or(DbError::NilHandle)
}

macro_rules! handle_common {
    ($ty:ident $(<$t:ident>)?) => {
        impl$(<$t>)? $ty$(<$t>)? {
            /// Whether the handle was produced by a binder.
            pub fn is_bound(&self) -> bool {
                self.binding.is_some()
            }

            /// Template names tried in order, empty when unbound.
            pub fn templates(&self) -> &[String] {
                match &self.binding {
                    Some(binding) => &binding.candidates[..],
                    None => &[],
                }
            }

            /// Connection the handle targets.
            pub fn database(&self) -> DbResult<&Arc<Database>> {
                Ok(&bound(&self.binding)?.db)
            }
        }

        impl$(<$t>)? fmt::Debug for $ty$(<$t>)? {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty))
                    .field("db", &self.binding.as_ref().map(|b| b.db.name()))
                    .field("templates", &self.templates())
                    .finish()
            }
        }
    };
}

/// Execute with positional arguments.
#[derive(Clone, Default)]
pub struct ExecFn {
    binding: Option<Binding>,
}

impl ExecFn {
    pub(crate) fn new(binding: Binding) -> Self {
        Self {
            binding: Some(binding),
        }
    }

    pub async fn call(&self, args: &[Value]) -> DbResult<ExecResult> {
        let binding = bound(&self.binding)?;
        let name = binding.template()?;
        binding.db.exec(&name, args).await
    }
}

handle_common!(ExecFn);

/// Execute with one named argument (struct or map).
#[derive(Clone, Default)]
pub struct NamedExecFn {
    binding: Option<Binding>,
}

impl NamedExecFn {
    pub(crate) fn new(binding: Binding) -> Self {
        Self {
            binding: Some(binding),
        }
    }

    pub async fn call<A: Serialize + ?Sized>(&self, arg: &A) -> DbResult<ExecResult> {
        let binding = bound(&self.binding)?;
        let name = binding.template()?;
        binding.db.named_exec(&name, arg).await
    }
}

handle_common!(NamedExecFn);

/// Run a callback inside a transaction with the field's isolation level
/// and read-only flag. The [`Tx`] handle carries the bound template, see
/// [`Tx::exec_bound`].
#[derive(Clone, Default)]
pub struct TxFn {
    binding: Option<Binding>,
    options: TxOptions,
}

impl TxFn {
    pub(crate) fn new(binding: Binding, options: TxOptions) -> Self {
        Self {
            binding: Some(binding),
            options,
        }
    }

    pub fn options(&self) -> TxOptions {
        self.options
    }

    pub async fn call<F, Fut, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(Tx) -> Fut + Send,
        Fut: Future<Output = DbResult<T>> + Send,
        T: Send,
    {
        let binding = bound(&self.binding)?;
        binding
            .db
            .transaction_bound(self.options, binding.candidates.to_vec(), f)
            .await
    }
}

handle_common!(TxFn);

/// Query with positional arguments, decoding every row into `T`.
pub struct SelectFn<T> {
    binding: Option<Binding>,
    _row: PhantomData<fn() -> T>,
}

/// Query with a named argument, decoding every row into `T`.
pub struct NamedSelectFn<T> {
    binding: Option<Binding>,
    _row: PhantomData<fn() -> T>,
}

/// Query with positional arguments, decoding the first row into `T`.
pub struct GetFn<T> {
    binding: Option<Binding>,
    _row: PhantomData<fn() -> T>,
}

/// Query with a named argument, decoding the first row into `T`.
pub struct NamedGetFn<T> {
    binding: Option<Binding>,
    _row: PhantomData<fn() -> T>,
}

// Manual impls: `T` itself need not be `Clone` or `Default`.
macro_rules! typed_handle {
    ($ty:ident) => {
        impl<T> $ty<T> {
            pub(crate) fn new(binding: Binding) -> Self {
                Self {
                    binding: Some(binding),
                    _row: PhantomData,
                }
            }
        }

        impl<T> Default for $ty<T> {
            fn default() -> Self {
                Self {
                    binding: None,
                    _row: PhantomData,
                }
            }
        }

        impl<T> Clone for $ty<T> {
            fn clone(&self) -> Self {
                Self {
                    binding: self.binding.clone(),
                    _row: PhantomData,
                }
            }
        }

        handle_common!($ty<T>);
    };
}

typed_handle!(SelectFn);
typed_handle!(NamedSelectFn);
typed_handle!(GetFn);
typed_handle!(NamedGetFn);

impl<T: DeserializeOwned + Send> SelectFn<T> {
    pub async fn call(&self, args: &[Value]) -> DbResult<Vec<T>> {
        let binding = bound(&self.binding)?;
        let name = binding.template()?;
        binding.db.select(&name, args).await
    }
}

impl<T: DeserializeOwned + Send> NamedSelectFn<T> {
    pub async fn call<A: Serialize + ?Sized>(&self, arg: &A) -> DbResult<Vec<T>> {
        let binding = bound(&self.binding)?;
        let name = binding.template()?;
        binding.db.named_select(&name, arg).await
    }
}

impl<T: DeserializeOwned + Send> GetFn<T> {
    /// First row; [`DbError::NotFound`] when there is none.
    pub async fn call(&self, args: &[Value]) -> DbResult<T> {
        let binding = bound(&self.binding)?;
        let name = binding.template()?;
        binding.db.get(&name, args).await
    }
}

impl<T: DeserializeOwned + Send> NamedGetFn<T> {
    pub async fn call<A: Serialize + ?Sized>(&self, arg: &A) -> DbResult<T> {
        let binding = bound(&self.binding)?;
        let name = binding.template()?;
        binding.db.named_get(&name, arg).await
    }
}
