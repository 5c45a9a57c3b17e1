/*
 * Copyright (c) 2026 Yumechi <yume@yumechi.jp>
 *
 * Created on Tuesday, October 6, 2026
 * Author: Yumechi <yume@yumechi.jp>
 *
 * SPDX-License-Identifier: Apache-2.0
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

/// Luma weight of the red channel.
pub const LUMA_RED: f32 = 0.3;

/// Luma weight of the green channel.
pub const LUMA_GREEN: f32 = 0.59;

/// Luma weight of the blue channel.
pub const LUMA_BLUE: f32 = 0.11;

/// Scale between a byte channel value and its `[0, 1]` float form.
pub const BYTE_SCALE: f32 = 255.0;
