//! Read models returned to clients and handed to the document renderer.
//! Foreign keys stay on the wire; the names next to them are resolved here.

use serde::Serialize;
use std::collections::HashMap;

use crate::database::models::{Area, Comment, Request, RequestType, User};
use crate::database::store::Store;
use crate::services::ServiceResult;
use crate::types::Role;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    #[serde(flatten)]
    pub request: Request,
    pub area_name: Option<String>,
    pub type_name: Option<String>,
    pub requester_name: Option<String>,
    pub requester_email: Option<String>,
    pub assigned_agent_name: Option<String>,
    pub assigned_agent_email: Option<String>,
    /// Only filled on the detail view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentView>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_name: Option<String>,
    pub author_role: Option<Role>,
    /// Area of the author, if they belong to one
    pub author_area: Option<String>,
}

/// Builds views with one store lookup per distinct user, area and type
pub struct ViewResolver<'a> {
    store: &'a dyn Store,
    users: HashMap<i32, Option<User>>,
    areas: HashMap<i32, Option<Area>>,
    types: HashMap<i32, Option<RequestType>>,
}

impl<'a> ViewResolver<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self {
            store,
            users: HashMap::new(),
            areas: HashMap::new(),
            types: HashMap::new(),
        }
    }

    async fn user(&mut self, id: i32) -> ServiceResult<Option<User>> {
        if !self.users.contains_key(&id) {
            let user = self.store.find_user(id).await?;
            self.users.insert(id, user);
        }
        Ok(self.users.get(&id).cloned().flatten())
    }

    async fn area_name(&mut self, id: i32) -> ServiceResult<Option<String>> {
        if !self.areas.contains_key(&id) {
            let area = self.store.find_area(id).await?;
            self.areas.insert(id, area);
        }
        Ok(self.areas.get(&id).and_then(|a| a.as_ref()).map(|a| a.name.clone()))
    }

    async fn type_name(&mut self, id: i32) -> ServiceResult<Option<String>> {
        if !self.types.contains_key(&id) {
            let request_type = self.store.find_request_type(id).await?;
            self.types.insert(id, request_type);
        }
        Ok(self.types.get(&id).and_then(|t| t.as_ref()).map(|t| t.name.clone()))
    }

    pub async fn request(&mut self, request: Request) -> ServiceResult<RequestView> {
        let area_name = match request.area_id {
            Some(id) => self.area_name(id).await?,
            None => None,
        };
        let type_name = self.type_name(request.type_id).await?;
        let requester = self.user(request.requester_id).await?;
        let agent = match request.assigned_agent_id {
            Some(id) => self.user(id).await?,
            None => None,
        };

        Ok(RequestView {
            request,
            area_name,
            type_name,
            requester_name: requester.as_ref().map(|u| u.display_name.clone()),
            requester_email: requester.map(|u| u.email),
            assigned_agent_name: agent.as_ref().map(|u| u.display_name.clone()),
            assigned_agent_email: agent.map(|u| u.email),
            comments: None,
        })
    }

    pub async fn requests(&mut self, requests: Vec<Request>) -> ServiceResult<Vec<RequestView>> {
        let mut views = Vec::with_capacity(requests.len());
        for request in requests {
            views.push(self.request(request).await?);
        }
        Ok(views)
    }

    pub async fn comment(&mut self, comment: Comment) -> ServiceResult<CommentView> {
        let author = self.user(comment.author_id).await?;
        let author_area = match author.as_ref().and_then(|u| u.area_id) {
            Some(id) => self.area_name(id).await?,
            None => None,
        };

        Ok(CommentView {
            comment,
            author_name: author.as_ref().map(|u| u.display_name.clone()),
            author_role: author.map(|u| u.role),
            author_area,
        })
    }

    pub async fn comments(&mut self, comments: Vec<Comment>) -> ServiceResult<Vec<CommentView>> {
        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            views.push(self.comment(comment).await?);
        }
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::NewRequestInput;
    use crate::testing::TestContext;
    use crate::types::Priority;

    #[tokio::test]
    async fn request_view_names_every_reference() {
        let ctx = TestContext::new().await.unwrap();
        let alice = ctx.as_principal(&ctx.demo.alice);
        let admin = ctx.as_principal(&ctx.demo.admin);
        let service = ctx.requests();

        let input = NewRequestInput {
            type_id: ctx.demo.hardware.id,
            subject: "Monitor".into(),
            description: "Flickers".into(),
            priority: Priority::Medium,
            attachment: None,
        };
        let request = service.create(&alice, input).await.unwrap();
        let request = service.assign(request.id, ctx.demo.it_agent.id, &admin).await.unwrap();

        let view = ViewResolver::new(ctx.store.as_ref()).request(request).await.unwrap();
        assert_eq!(view.area_name.as_deref(), Some("IT Support"));
        assert_eq!(view.type_name.as_deref(), Some("Hardware"));
        assert_eq!(view.requester_name.as_deref(), Some("Alice"));
        assert_eq!(view.requester_email.as_deref(), Some("alice@desk.local"));
        assert_eq!(view.assigned_agent_name.as_deref(), Some("Ana IT"));
        assert_eq!(view.assigned_agent_email.as_deref(), Some("it.agent@desk.local"));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["number"], view.request.number);
        assert_eq!(json["areaName"], "IT Support");
        assert!(json.get("comments").is_none());
        assert!(json.get("version").is_none());
    }

    #[tokio::test]
    async fn other_requests_have_no_area_name() {
        let ctx = TestContext::new().await.unwrap();
        let alice = ctx.as_principal(&ctx.demo.alice);
        let input = NewRequestInput {
            type_id: ctx.demo.other.id,
            subject: "Parking".into(),
            description: "Need a spot".into(),
            priority: Priority::Low,
            attachment: None,
        };
        let request = ctx.requests().create(&alice, input).await.unwrap();

        let view = ViewResolver::new(ctx.store.as_ref()).request(request).await.unwrap();
        assert_eq!(view.area_name, None);
        assert_eq!(view.type_name.as_deref(), Some("Other"));
        assert_eq!(view.assigned_agent_name, None);
    }

    #[tokio::test]
    async fn comment_view_carries_author_role_and_area() {
        let ctx = TestContext::new().await.unwrap();
        let alice = ctx.as_principal(&ctx.demo.alice);
        let agent = ctx.as_principal(&ctx.demo.it_agent);
        let input = NewRequestInput {
            type_id: ctx.demo.hardware.id,
            subject: "Mouse".into(),
            description: "Broken".into(),
            priority: Priority::Low,
            attachment: None,
        };
        let request = ctx.requests().create(&alice, input).await.unwrap();
        let comment = ctx.comments().add_comment(request.id, "On it", &agent).await.unwrap();

        let mut resolver = ViewResolver::new(ctx.store.as_ref());
        let view = resolver.comment(comment).await.unwrap();
        assert_eq!(view.author_name.as_deref(), Some("Ana IT"));
        assert_eq!(view.author_role, Some(Role::AreaAgent));
        assert_eq!(view.author_area.as_deref(), Some("IT Support"));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["text"], "On it");
        assert_eq!(json["authorRole"], "AgenteArea");
    }
}
