use sea_orm::{EntityTrait, QuerySelect, Select};

use campus_domain::pagination::PageRequest;

/// Apply a [`PageRequest`] as `LIMIT`/`OFFSET`.
pub trait Paginate {
    fn paginate(self, page: PageRequest) -> Self;
}

impl<E> Paginate for Select<E>
where
    E: EntityTrait,
{
    fn paginate(self, page: PageRequest) -> Self {
        self.offset(page.offset()).limit(page.limit())
    }
}
