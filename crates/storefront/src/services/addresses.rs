//! Per-user address book.
//!
//! The book is a list of [`SavedAddress`] in which at most one entry is the
//! default, and exactly one whenever the list is non-empty. The free functions
//! here maintain that on a plain `Vec`; [`AddressService`] loads and saves the
//! book around them.

use thiserror::Error;
use uuid::Uuid;

use hoi_core::UserId;

use crate::db::{RepositoryError, UserStore};
use crate::models::{AddressInput, MissingField, PostalAddress, SavedAddress};

/// Errors from address book operations.
#[derive(Debug, Error)]
pub enum AddressError {
    #[error(transparent)]
    MissingField(#[from] MissingField),

    #[error("This address already exists in your account.")]
    Duplicate,

    #[error("Address not found")]
    NotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn normalize_opt(value: Option<&str>) -> String {
    value.map(normalize).unwrap_or_default()
}

/// Same place: line 1, line 2, city, state and pincode after normalization.
fn same_place(a: &PostalAddress, b: &PostalAddress) -> bool {
    normalize(&a.address_line1) == normalize(&b.address_line1)
        && normalize_opt(a.address_line2.as_deref()) == normalize_opt(b.address_line2.as_deref())
        && normalize(&a.city) == normalize(&b.city)
        && normalize(&a.state) == normalize(&b.state)
        && normalize(&a.pincode) == normalize(&b.pincode)
}

/// Same delivery target: line 1, pincode and phone after normalization.
fn same_delivery(a: &PostalAddress, b: &PostalAddress) -> bool {
    normalize(&a.address_line1) == normalize(&b.address_line1)
        && normalize(&a.pincode) == normalize(&b.pincode)
        && normalize(&a.phone) == normalize(&b.phone)
}

fn make_sole_default(book: &mut [SavedAddress], id: Uuid) {
    for entry in book.iter_mut() {
        entry.is_default = entry.id == id;
    }
}

/// Append a new address.
///
/// The first address always becomes the default. A later one becomes the
/// default only when `isDefault` is set, clearing the flag everywhere else.
///
/// # Errors
///
/// Returns `MissingField` for an incomplete address and `Duplicate` when the
/// same place is already saved.
pub fn add(book: &mut Vec<SavedAddress>, input: &AddressInput) -> Result<Uuid, AddressError> {
    let address = input.to_postal()?;
    if book.iter().any(|saved| same_place(&saved.address, &address)) {
        return Err(AddressError::Duplicate);
    }

    let id = Uuid::new_v4();
    let is_default = book.is_empty() || input.is_default == Some(true);
    if is_default {
        make_sole_default(book, id);
    }
    book.push(SavedAddress {
        id,
        address,
        is_default,
    });
    Ok(id)
}

/// Apply the fields present in `input` to one address.
///
/// `isDefault = true` makes it the sole default. `isDefault = false` is
/// ignored so the book never loses its default.
///
/// # Errors
///
/// Returns `NotFound` if no address has this id, `MissingField` when a
/// required field is blanked, and `Duplicate` when the edit would match
/// another saved place. The book is unchanged on error.
pub fn update(
    book: &mut [SavedAddress],
    id: Uuid,
    input: &AddressInput,
) -> Result<(), AddressError> {
    let mut address = book
        .iter()
        .find(|a| a.id == id)
        .map(|a| a.address.clone())
        .ok_or(AddressError::NotFound)?;
    input.apply_to(&mut address)?;
    if book
        .iter()
        .any(|saved| saved.id != id && same_place(&saved.address, &address))
    {
        return Err(AddressError::Duplicate);
    }
    if let Some(entry) = book.iter_mut().find(|a| a.id == id) {
        entry.address = address;
    }

    if input.is_default == Some(true) {
        make_sole_default(book, id);
    }
    Ok(())
}

/// Remove an address. If it was the default, the first remaining address
/// is promoted.
///
/// # Errors
///
/// Returns `NotFound` if no address has this id.
pub fn remove(book: &mut Vec<SavedAddress>, id: Uuid) -> Result<(), AddressError> {
    let index = book
        .iter()
        .position(|a| a.id == id)
        .ok_or(AddressError::NotFound)?;
    let removed = book.remove(index);

    if removed.is_default
        && let Some(first) = book.first_mut()
    {
        first.is_default = true;
    }
    Ok(())
}

/// Make one address the sole default.
///
/// # Errors
///
/// Returns `NotFound` if no address has this id.
pub fn set_default(book: &mut [SavedAddress], id: Uuid) -> Result<(), AddressError> {
    if !book.iter().any(|a| a.id == id) {
        return Err(AddressError::NotFound);
    }
    make_sole_default(book, id);
    Ok(())
}

/// Save an order's shipping address unless the same delivery target is
/// already in the book. Returns whether the book changed.
pub fn remember_shipping_address(book: &mut Vec<SavedAddress>, address: &PostalAddress) -> bool {
    if book.iter().any(|saved| same_delivery(&saved.address, address)) {
        return false;
    }
    book.push(SavedAddress {
        id: Uuid::new_v4(),
        address: address.clone(),
        is_default: book.is_empty(),
    });
    true
}

/// Address book operations for one account.
pub struct AddressService<'a> {
    users: &'a dyn UserStore,
}

impl<'a> AddressService<'a> {
    #[must_use]
    pub const fn new(users: &'a dyn UserStore) -> Self {
        Self { users }
    }

    async fn load(&self, user_id: UserId) -> Result<Vec<SavedAddress>, AddressError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|u| u.addresses)
            .ok_or(AddressError::UserNotFound)
    }

    async fn store(
        &self,
        user_id: UserId,
        book: Vec<SavedAddress>,
    ) -> Result<Vec<SavedAddress>, AddressError> {
        self.users.save_addresses(user_id, &book).await?;
        Ok(book)
    }

    /// # Errors
    ///
    /// Returns `UserNotFound` if the account is gone.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<SavedAddress>, AddressError> {
        self.load(user_id).await
    }

    /// Add an address and return the whole book.
    ///
    /// # Errors
    ///
    /// See [`add`].
    #[tracing::instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn add(
        &self,
        user_id: UserId,
        input: &AddressInput,
    ) -> Result<Vec<SavedAddress>, AddressError> {
        let mut book = self.load(user_id).await?;
        add(&mut book, input)?;
        self.store(user_id, book).await
    }

    /// Update an address and return the whole book.
    ///
    /// # Errors
    ///
    /// See [`update`].
    #[tracing::instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn update(
        &self,
        user_id: UserId,
        id: Uuid,
        input: &AddressInput,
    ) -> Result<Vec<SavedAddress>, AddressError> {
        let mut book = self.load(user_id).await?;
        update(&mut book, id, input)?;
        self.store(user_id, book).await
    }

    /// Remove an address and return the whole book.
    ///
    /// # Errors
    ///
    /// See [`remove`].
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn remove(
        &self,
        user_id: UserId,
        id: Uuid,
    ) -> Result<Vec<SavedAddress>, AddressError> {
        let mut book = self.load(user_id).await?;
        remove(&mut book, id)?;
        self.store(user_id, book).await
    }

    /// Make an address the default and return the whole book.
    ///
    /// # Errors
    ///
    /// See [`set_default`].
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn set_default(
        &self,
        user_id: UserId,
        id: Uuid,
    ) -> Result<Vec<SavedAddress>, AddressError> {
        let mut book = self.load(user_id).await?;
        set_default(&mut book, id)?;
        self.store(user_id, book).await
    }
}
