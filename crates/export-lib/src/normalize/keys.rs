//! Well-known label and annotation keys set by Knative serving and its clients

pub mod labels {
    //! Labels stamped onto revisions by the serving controller.

    pub const SERVICE: &str = "serving.knative.dev/service";
    pub const CONFIGURATION: &str = "serving.knative.dev/configuration";
    pub const CONFIGURATION_GENERATION: &str = "serving.knative.dev/configurationGeneration";
    pub const ROUTE: &str = "serving.knative.dev/route";
    pub const ROUTING_STATE: &str = "serving.knative.dev/routingState";
    pub const CONFIGURATION_UID: &str = "serving.knative.dev/configurationUID";
    pub const SERVICE_UID: &str = "serving.knative.dev/serviceUID";

    /// Prefix owned by the serving controller
    pub const SERVING_PREFIX: &str = "serving.knative.dev/";
}

pub mod annotations {
    //! Annotations written by the serving webhook, controllers and clients.

    pub const CREATOR: &str = "serving.knative.dev/creator";
    pub const LAST_MODIFIER: &str = "serving.knative.dev/lastModifier";
    pub const ROUTES: &str = "serving.knative.dev/routes";
    pub const ROUTING_STATE_MODIFIED: &str = "serving.knative.dev/routingStateModified";
    pub const LAST_PINNED: &str = "serving.knative.dev/lastPinned";
    pub const USER_IMAGE: &str = "client.knative.dev/user-image";
    pub const LAST_APPLIED_CONFIGURATION: &str = "kubectl.kubernetes.io/last-applied-configuration";
}

/// Annotations dropped from services and their templates
pub const SERVICE_VOLATILE_ANNOTATIONS: &[&str] = &[
    annotations::CREATOR,
    annotations::LAST_MODIFIER,
    annotations::LAST_APPLIED_CONFIGURATION,
];

/// Labels dropped from exported revisions; creation-time linkage labels stay
pub const REVISION_VOLATILE_LABELS: &[&str] = &[
    labels::ROUTING_STATE,
    labels::CONFIGURATION_UID,
    labels::SERVICE_UID,
];

/// Annotations dropped from exported revisions; creator and user image stay
pub const REVISION_VOLATILE_ANNOTATIONS: &[&str] = &[
    annotations::ROUTES,
    annotations::ROUTING_STATE_MODIFIED,
    annotations::LAST_PINNED,
    annotations::LAST_APPLIED_CONFIGURATION,
];

/// Annotations dropped when a revision is turned back into a service template
pub const TEMPLATE_SYSTEM_ANNOTATIONS: &[&str] = &[
    annotations::CREATOR,
    annotations::LAST_MODIFIER,
    annotations::ROUTES,
    annotations::ROUTING_STATE_MODIFIED,
    annotations::LAST_PINNED,
    annotations::LAST_APPLIED_CONFIGURATION,
];
