#![allow(unused_imports)]

pub(crate) use crate::error::Error;
pub(crate) use crate::lin_search_hint::*;
pub(crate) use crate::si;
pub(crate) use crate::traits::*;
pub(crate) use crate::uc;
pub(crate) use crate::utils;
pub(crate) use crate::utils::{almost_eq, interp1d, is_sorted};
pub(crate) use anyhow::{anyhow, bail, ensure, Context};
pub(crate) use duplicate::duplicate_item;
pub(crate) use easy_ext::ext;
pub(crate) use eng_fmt::FormatEng;
pub(crate) use serde::{Deserialize, Serialize};
pub(crate) use std::collections::BTreeMap;
pub(crate) use std::ffi::OsStr;
pub(crate) use std::fs::File;
pub(crate) use std::path::{Path, PathBuf};
pub(crate) use std::sync::Arc;
pub(crate) use std::fmt;
pub(crate) use uom::ConstZero;
