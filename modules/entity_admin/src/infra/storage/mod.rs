pub mod sea_orm_repo;
