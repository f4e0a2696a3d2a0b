mod category;
mod description;
mod id;
mod owner;
mod price;
mod quantity;
mod title;

pub use self::{
    category::*, description::*, id::*, owner::*, price::*, quantity::*, title::*,
};
use crate::entity::common::{CreatedAt, UpdatedAt};
use destructure::{Destructure, Mutation};
use vodca::References;

#[derive(Debug, Clone, Eq, PartialEq, References, Destructure, Mutation)]
pub struct Book {
    id: BookId,
    title: BookTitle,
    description: Option<BookDescription>,
    price: BookPrice,
    quantity: BookQuantity,
    category: Option<BookCategory>,
    owner_id: OwnerId,
    owner_name: OwnerName,
    created_at: CreatedAt<Book>,
    updated_at: Option<UpdatedAt<Book>>,
}

impl Book {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: BookId,
        title: BookTitle,
        description: Option<BookDescription>,
        price: BookPrice,
        quantity: BookQuantity,
        category: Option<BookCategory>,
        owner_id: OwnerId,
        owner_name: OwnerName,
        created_at: CreatedAt<Book>,
        updated_at: Option<UpdatedAt<Book>>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            price,
            quantity,
            category,
            owner_id,
            owner_name,
            created_at,
            updated_at,
        }
    }

    pub fn is_available(&self) -> bool {
        *self.quantity.as_ref() > 0
    }
}
