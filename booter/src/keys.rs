/*++

Licensed under the Apache-2.0 license.

File Name:

    keys.rs

Abstract:

    LS verification keys embedded at build time.

--*/

use booter_image_types::{LsKeys, Rsa3072PubKey};

include!(concat!(env!("OUT_DIR"), "/ls_keys.rs"));

pub const LS_KEYS: LsKeys = LsKeys {
    prod: PROD_LS_KEY,
    debug: DEBUG_LS_KEY,
};
