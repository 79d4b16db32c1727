// SPDX-License-Identifier: Apache-2.0 OR MIT
//! End-to-end ceremony tests live in `tests/`.
