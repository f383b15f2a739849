// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OCI registry pulls.

use super::{OciError, OciOpts};
use oci_client::client::{Client, ClientConfig, ClientProtocol};
use oci_client::errors::OciDistributionError;
use oci_client::secrets::RegistryAuth;
use oci_client::Reference;

/// Layer media types we accept from a scenario artifact.
const ACCEPTED_MEDIA_TYPES: &[&str] = &[
    "application/vnd.oci.image.layer.v1.tar",
    "application/vnd.oci.image.layer.v1.tar+gzip",
    "application/vnd.docker.image.rootfs.diff.tar.gzip",
];

pub(crate) struct Pulled {
    pub layers: Vec<Vec<u8>>,
    // NOTE(compat): manifest digest, available for digest-pinned caching.
    #[allow(dead_code)]
    pub digest: String,
}

/// Pull a scenario artifact and return its layer blobs.
pub(crate) async fn pull(reference: &str, opts: &OciOpts) -> Result<Pulled, OciError> {
    let reference: Reference = reference
        .parse()
        .map_err(|e| OciError::Malformed(format!("invalid reference {reference:?}: {e}")))?;

    let protocol = if opts.insecure { ClientProtocol::Http } else { ClientProtocol::Https };
    let client = Client::new(ClientConfig { protocol, ..Default::default() });

    let auth = match (&opts.username, &opts.password) {
        (Some(user), Some(pass)) => RegistryAuth::Basic(user.clone(), pass.clone()),
        _ => RegistryAuth::Anonymous,
    };

    let image = client
        .pull(&reference, &auth, ACCEPTED_MEDIA_TYPES.to_vec())
        .await
        .map_err(map_pull_error)?;

    Ok(Pulled {
        layers: image.layers.into_iter().map(|layer| layer.data).collect(),
        digest: image.digest.unwrap_or_default(),
    })
}

fn map_pull_error(e: OciDistributionError) -> OciError {
    match e {
        OciDistributionError::AuthenticationFailure(msg) => OciError::Unauthenticated(msg),
        OciDistributionError::UnauthorizedError { url } => OciError::Unauthenticated(url),
        other => OciError::Unavailable(other.to_string()),
    }
}
