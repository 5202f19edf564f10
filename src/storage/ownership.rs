// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership of resources targeted by a request.

use uuid::Uuid;

use super::{Product, User};

/// Trait for resources that have an owner.
///
/// Product authorization evaluates against the owner id returned here rather
/// than the caller's own id.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> Uuid;
}

impl OwnedResource for Product {
    fn owner_user_id(&self) -> Uuid {
        self.user_id
    }
}

/// A user owns itself.
impl OwnedResource for User {
    fn owner_user_id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn product_owner_is_its_user() {
        let owner = Uuid::new_v4();
        let product = Product {
            id: Uuid::new_v4(),
            user_id: owner,
            name: "Comic Books".to_string(),
            cost: 10.5,
            quantity: 3,
        };
        assert_eq!(product.owner_user_id(), owner);
        assert_ne!(product.owner_user_id(), product.id);
    }

    #[test]
    fn user_owns_itself() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            roles: BTreeSet::new(),
            enabled: true,
        };
        assert_eq!(user.owner_user_id(), user.id);
    }
}
