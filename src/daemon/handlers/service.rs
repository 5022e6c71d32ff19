use tracing::debug;

use super::super::dispatcher::RequestContext;
use crate::common::ipc::{BrokerReply, BrokerRequest};
use crate::service::{ServiceError, ShortcutService};

fn reply<T>(result: Result<T, ServiceError>, wrap: impl FnOnce(T) -> BrokerReply) -> BrokerReply {
    match result {
        Ok(value) => wrap(value),
        Err(err) => BrokerReply::Error(err),
    }
}

/// Run a shortcut-service call against the registry
#[tracing::instrument(skip_all)]
pub fn handle_service(ctx: &mut RequestContext, request: BrokerRequest) -> BrokerReply {
    let Some(registry) = ctx.session.registry_mut() else {
        debug!(?request, "Registry unavailable");
        return BrokerReply::Error(ServiceError::Unavailable);
    };
    let mut service = ShortcutService::new(registry);

    let answer = match request {
        BrokerRequest::AllMainComponents => BrokerReply::Actions(service.all_main_components()),
        BrokerRequest::AllActionsForComponent(action) => {
            BrokerReply::Actions(service.all_actions_for_component(&action))
        }
        BrokerRequest::ActionList(key) => BrokerReply::Action(service.action_list(&key)),
        BrokerRequest::ShortcutKeys(action) => BrokerReply::Keys(service.shortcut_keys(&action)),
        BrokerRequest::DefaultShortcutKeys(action) => {
            BrokerReply::Keys(service.default_shortcut_keys(&action))
        }
        BrokerRequest::SetShortcutKeys {
            action,
            keys,
            flags,
        } => BrokerReply::Keys(service.set_shortcut_keys(&action, &keys, flags)),
        BrokerRequest::SetForeignShortcutKeys { action, keys } => {
            service.set_foreign_shortcut_keys(&action, &keys);
            BrokerReply::Done
        }
        BrokerRequest::GlobalShortcutsByKey { key, match_type } => {
            BrokerReply::Infos(service.global_shortcuts_by_key(&key, match_type))
        }
        BrokerRequest::IsGlobalShortcutAvailable { key, component } => {
            BrokerReply::Bool(service.is_global_shortcut_available(&key, &component))
        }
        BrokerRequest::BlockGlobalShortcuts(block) => {
            service.block_global_shortcuts(block);
            BrokerReply::Done
        }
        BrokerRequest::DoRegister(action) => {
            service.do_register(&action);
            BrokerReply::Done
        }
        BrokerRequest::Unregister { component, action } => {
            BrokerReply::Bool(service.unregister(&component, &action))
        }
        BrokerRequest::SetInactive(action) => {
            service.set_inactive(&action);
            BrokerReply::Done
        }
        BrokerRequest::ActivateGlobalShortcutContext { component, context } => {
            BrokerReply::Bool(service.activate_global_shortcut_context(&component, &context))
        }
        BrokerRequest::GetComponent(component) => {
            reply(service.get_component(&component), BrokerReply::ObjectPath)
        }
        BrokerRequest::ShortcutNames { component, context } => {
            reply(service.shortcut_names(&component, &context), BrokerReply::Names)
        }
        BrokerRequest::AllShortcutInfos { component, context } => {
            reply(service.all_shortcut_infos(&component, &context), BrokerReply::Infos)
        }
        BrokerRequest::ContextNames(component) => {
            reply(service.context_names(&component), BrokerReply::Names)
        }
        BrokerRequest::InvokeShortcut {
            component,
            action,
            context,
        } => reply(service.invoke_shortcut(&component, &action, &context), BrokerReply::Bool),
        BrokerRequest::CleanUp(component) => reply(service.clean_up(&component), BrokerReply::Bool),
        BrokerRequest::IsActive(component) => reply(service.is_active(&component), BrokerReply::Bool),
        other => {
            debug!(request = ?other, "Not a service request");
            BrokerReply::Done
        }
    };

    ctx.changes.extend(service.into_changes());
    answer
}
