use std::collections::HashMap;

use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::data::models::{AppError, NewTag, Tag, TagForm, TagWithCount};
use crate::data::repositories::last_insert_rowid;
use crate::schema::{tags, word_tags};

pub struct TagRepository;

impl TagRepository {
    pub fn list(conn: &mut SqliteConnection) -> Result<Vec<Tag>, AppError> {
        let rows = tags::table
            .select(Tag::as_select())
            .order_by(tags::tag_name.asc())
            .load(conn)?;
        Ok(rows)
    }

    pub fn list_with_counts(conn: &mut SqliteConnection) -> Result<Vec<TagWithCount>, AppError> {
        let counts: HashMap<i32, i64> = word_tags::table
            .group_by(word_tags::tag_id)
            .select((word_tags::tag_id, diesel::dsl::count_star()))
            .load::<(i32, i64)>(conn)?
            .into_iter()
            .collect();

        let rows = Self::list(conn)?
            .into_iter()
            .map(|tag| TagWithCount {
                term_count: counts.get(&tag.tag_id).copied().unwrap_or(0),
                tag_id: tag.tag_id,
                tag_name: tag.tag_name,
                comment: tag.comment,
            })
            .collect();
        Ok(rows)
    }

    pub fn find(conn: &mut SqliteConnection, tag_id: i32) -> Result<Tag, AppError> {
        tags::table
            .filter(tags::tag_id.eq(tag_id))
            .select(Tag::as_select())
            .first(conn)
            .optional()?
            .ok_or(AppError::NotFound("Tag"))
    }

    pub fn create(conn: &mut SqliteConnection, form: &TagForm) -> Result<i32, AppError> {
        let name = form.tag_name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Tag name is not set!".to_string()));
        }
        let inserted = diesel::insert_into(tags::table)
            .values(&NewTag {
                tag_name: name,
                comment: form.comment.trim(),
            })
            .execute(conn);
        match inserted {
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(AppError::Duplicate("tag"))
            }
            Err(e) => Err(e.into()),
            Ok(_) => Ok(last_insert_rowid(conn)?),
        }
    }

    pub fn update(
        conn: &mut SqliteConnection,
        tag_id: i32,
        form: &TagForm,
    ) -> Result<(), AppError> {
        let name = form.tag_name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Tag name is not set!".to_string()));
        }
        let result = diesel::update(tags::table.filter(tags::tag_id.eq(tag_id)))
            .set((tags::tag_name.eq(name), tags::comment.eq(form.comment.trim())))
            .execute(conn);
        match result {
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(AppError::Duplicate("tag"))
            }
            Err(e) => Err(e.into()),
            Ok(0) => Err(AppError::NotFound("Tag")),
            Ok(_) => Ok(()),
        }
    }

    pub fn delete(conn: &mut SqliteConnection, tag_id: i32) -> Result<(), AppError> {
        conn.transaction::<_, AppError, _>(|conn| {
            diesel::delete(word_tags::table.filter(word_tags::tag_id.eq(tag_id)))
                .execute(conn)?;
            let deleted =
                diesel::delete(tags::table.filter(tags::tag_id.eq(tag_id))).execute(conn)?;
            if deleted == 0 {
                return Err(AppError::NotFound("Tag"));
            }
            Ok(())
        })
    }

    pub fn find_or_create(conn: &mut SqliteConnection, name: &str) -> Result<i32, AppError> {
        let name = name.trim();
        if let Some(tag_id) = tags::table
            .filter(tags::tag_name.eq(name))
            .select(tags::tag_id)
            .first::<i32>(conn)
            .optional()?
        {
            return Ok(tag_id);
        }
        diesel::insert_into(tags::table)
            .values(&NewTag {
                tag_name: name,
                comment: "",
            })
            .execute(conn)?;
        Ok(last_insert_rowid(conn)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::repositories::test_support::test_conn;

    fn tag_form(name: &str) -> TagForm {
        TagForm {
            tag_name: name.to_string(),
            comment: String::new(),
        }
    }

    #[test]
    fn duplicate_tag_name_is_rejected() {
        let mut conn = test_conn();
        TagRepository::create(&mut conn, &tag_form("noun")).unwrap();
        assert!(matches!(
            TagRepository::create(&mut conn, &tag_form("noun")),
            Err(AppError::Duplicate("tag"))
        ));
    }

    #[test]
    fn find_or_create_reuses_existing_rows() {
        let mut conn = test_conn();
        let first = TagRepository::find_or_create(&mut conn, "noun").unwrap();
        let second = TagRepository::find_or_create(&mut conn, " noun ").unwrap();
        assert_eq!(first, second);
        assert_eq!(TagRepository::list(&mut conn).unwrap().len(), 1);
    }

    #[test]
    fn delete_removes_word_links() {
        let mut conn = test_conn();
        let tag_id = TagRepository::create(&mut conn, &tag_form("noun")).unwrap();
        diesel::insert_into(crate::schema::words::table)
            .values((
                crate::schema::words::lang_id.eq(1),
                crate::schema::words::word.eq("Haus"),
                crate::schema::words::word_lc.eq("haus"),
            ))
            .execute(&mut conn)
            .unwrap();
        diesel::insert_into(word_tags::table)
            .values((word_tags::word_id.eq(1), word_tags::tag_id.eq(tag_id)))
            .execute(&mut conn)
            .unwrap();

        TagRepository::delete(&mut conn, tag_id).unwrap();
        let links: i64 = word_tags::table.count().get_result(&mut conn).unwrap();
        assert_eq!(links, 0);
    }

    #[test]
    fn counts_follow_links() {
        let mut conn = test_conn();
        let tag_id = TagRepository::create(&mut conn, &tag_form("noun")).unwrap();
        let counted = TagRepository::list_with_counts(&mut conn).unwrap();
        assert_eq!(counted[0].tag_id, tag_id);
        assert_eq!(counted[0].term_count, 0);
    }
}
