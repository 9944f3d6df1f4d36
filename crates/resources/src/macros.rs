/// Implements `kube::Resource`, `ObjectIdentity` and `KruiseResource` for a
/// Kruise kind whose struct carries a `metadata: ObjectMeta` field and whose
/// module defines `families(..)`.
macro_rules! kruise_resource {
    (@impl $ty:ident, $kind:literal, $version:literal, $plural:literal, $scope:ty) => {
        impl kube::Resource for $ty {
            type DynamicType = ();
            type Scope = $scope;

            fn kind(_: &()) -> std::borrow::Cow<'_, str> { std::borrow::Cow::Borrowed($kind) }
            fn group(_: &()) -> std::borrow::Cow<'_, str> { std::borrow::Cow::Borrowed($crate::GROUP) }
            fn version(_: &()) -> std::borrow::Cow<'_, str> { std::borrow::Cow::Borrowed($version) }
            fn plural(_: &()) -> std::borrow::Cow<'_, str> { std::borrow::Cow::Borrowed($plural) }

            fn meta(&self) -> &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta { &self.metadata }
            fn meta_mut(&mut self) -> &mut k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                &mut self.metadata
            }
        }

        impl ksm_core::ObjectIdentity for $ty {
            fn namespace(&self) -> &str { self.metadata.namespace.as_deref().unwrap_or("") }
            fn name(&self) -> &str { self.metadata.name.as_deref().unwrap_or("") }
        }
    };

    ($ty:ident, $kind:literal, $version:literal, $plural:literal, $registry:expr, namespaced) => {
        kruise_resource!(@impl $ty, $kind, $version, $plural, k8s_openapi::NamespaceResourceScope);

        impl $crate::KruiseResource for $ty {
            const KIND: $crate::ResourceKind = $registry;

            fn families(allow_annotations: &[String], allow_labels: &[String]) -> Vec<ksm_core::FamilyGenerator<Self>> {
                families(allow_annotations, allow_labels)
            }

            fn api(client: kube::Client, namespace: Option<&str>) -> kube::Api<Self> {
                match namespace {
                    Some(ns) if !ns.is_empty() => kube::Api::namespaced(client, ns),
                    _ => kube::Api::all(client),
                }
            }
        }
    };
    ($ty:ident, $kind:literal, $version:literal, $plural:literal, $registry:expr, cluster) => {
        kruise_resource!(@impl $ty, $kind, $version, $plural, k8s_openapi::ClusterResourceScope);

        impl $crate::KruiseResource for $ty {
            const KIND: $crate::ResourceKind = $registry;

            fn families(allow_annotations: &[String], allow_labels: &[String]) -> Vec<ksm_core::FamilyGenerator<Self>> {
                families(allow_annotations, allow_labels)
            }

            fn api(client: kube::Client, _namespace: Option<&str>) -> kube::Api<Self> {
                kube::Api::all(client)
            }
        }
    };
}
